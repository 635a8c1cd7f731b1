//! CFG builder and terminator tests
//!
//! Node creation for reachable blocks, mirrored edges, PHI incoming lists and the
//! terminator descriptors handed to the structurizer.

use dxil_spirv::cfg::{IncomingValue, NodeId, SwitchCase, Terminator};
use dxil_spirv::dxil::{BinaryOp, BlockId, FunctionBuilder, Module, Predicate};
use dxil_spirv::test_harness::*;
use dxil_spirv::{ConvertedFunction, Diagnostic, Error, Result};
use rspirv::spirv::Op;

/// `main` built block by block; `body` creates and fills every block itself.
fn function(body: impl FnOnce(&mut FunctionBuilder<'_>) -> Result<()>) -> Module {
    let mut module = ShaderBuilder::new("ps").finish();
    let mut f = FunctionBuilder::new(&mut module, "main");
    body(&mut f).unwrap();
    f.finish();
    module
}

fn node(converted: &ConvertedFunction, name: &str) -> NodeId {
    node_by_name(converted, name).unwrap_or_else(|| panic!("no node named {name}"))
}

fn names(converted: &ConvertedFunction) -> Vec<&str> {
    converted
        .visit_order
        .iter()
        .map(|id| converted.node_pool[*id].name.as_str())
        .collect()
}

// ── Node graph ──

#[test]
fn diamond_with_phi() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let then = f.add_block("then");
        let other = f.add_block("else");
        let merge = f.add_block("merge");
        let float = f.module().float_type();
        let a = f.add_argument(float);
        let b = f.add_argument(float);

        f.position_at_end(entry);
        let cond = f.cmp(Predicate::FcmpOlt, a, b)?;
        f.cond_br(cond, then, other)?;

        f.position_at_end(then);
        let x = f.binary(BinaryOp::FAdd, a, b)?;
        f.br(merge)?;

        f.position_at_end(other);
        let y = f.binary(BinaryOp::FMul, a, b)?;
        f.br(merge)?;

        f.position_at_end(merge);
        f.phi(float, vec![(x, then), (y, other)])?;
        f.ret(None)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let float = converted.module.type_float(32);

    assert_eq!(names(&converted), vec!["entry.entry", "then", "else", "merge"]);
    assert_eq!(converted.entry, converted.visit_order[0]);

    let (entry, then, other, merge) = (
        node(&converted, "entry.entry"),
        node(&converted, "then"),
        node(&converted, "else"),
        node(&converted, "merge"),
    );
    let pool = &converted.node_pool;
    assert_eq!(pool[entry].succ, vec![then, other]);
    assert_eq!(pool[merge].pred, vec![then, other]);
    assert_eq!(pool[then].pred, vec![entry]);

    let cmp = pool[entry].ir.operations[0].clone();
    assert_eq!(cmp.op, Op::FOrdLessThan);
    assert_eq!(
        pool[entry].ir.terminator,
        Some(Terminator::Condition {
            condition: cmp.id,
            on_true: then,
            on_false: other
        })
    );

    let add = pool[then].ir.operations[0].id;
    let mul = pool[other].ir.operations[0].id;
    let phi = &pool[merge].ir.phi[0];
    assert_eq!(phi.type_id, float);
    assert_eq!(
        phi.incoming,
        vec![
            IncomingValue { node: then, id: add },
            IncomingValue {
                node: other,
                id: mul
            },
        ]
    );
    assert_eq!(pool[then].ir.terminator, Some(Terminator::Branch(merge)));
    assert_eq!(pool[merge].ir.terminator, Some(Terminator::Return(None)));
    assert!(pool[merge].ir.operations.is_empty());
}

#[test]
fn loop_phi_refers_to_a_later_value() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let header = f.add_block("header");
        let body = f.add_block("body");
        let exit = f.add_block("exit");
        let int = f.module().int_type(32);
        let zero = f.module().const_i32(0);
        let one = f.module().const_i32(1);
        let limit = f.add_argument(int);

        f.position_at_end(entry);
        f.br(header)?;

        f.position_at_end(header);
        let i = f.phi(int, vec![(zero, entry)])?;
        let more = f.cmp(Predicate::IcmpSlt, i, limit)?;
        f.cond_br(more, body, exit)?;

        f.position_at_end(body);
        let next = f.binary(BinaryOp::Add, i, one)?;
        f.add_incoming(i, next, body)?;
        f.br(header)?;

        f.position_at_end(exit);
        f.ret(None)?;
        Ok(())
    });
    let mut converted = convert_default(&module).unwrap();
    let zero = converted.module.constant_u32(0);

    assert_eq!(names(&converted), vec!["entry.entry", "header", "body", "exit"]);
    let (entry, header, body) = (
        node(&converted, "entry.entry"),
        node(&converted, "header"),
        node(&converted, "body"),
    );
    let pool = &converted.node_pool;
    assert_eq!(pool[header].pred, vec![entry, body]);
    assert_eq!(pool[body].succ, vec![header]);

    let add = pool[body].ir.operations[0].clone();
    assert_eq!(add.op, Op::IAdd);
    let phi = &pool[header].ir.phi[0];
    assert_eq!(
        phi.incoming,
        vec![
            IncomingValue {
                node: entry,
                id: zero
            },
            IncomingValue {
                node: body,
                id: add.id
            },
        ]
    );
    // The add reads the phi it feeds.
    assert_eq!(add.arguments[0], phi.id);
}

#[test]
fn unreachable_blocks_get_no_node() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let orphan = f.add_block("orphan");
        let exit = f.add_block("exit");
        let float = f.module().float_type();
        let a = f.add_argument(float);
        let b = f.add_argument(float);

        f.position_at_end(entry);
        f.br(exit)?;
        f.position_at_end(orphan);
        f.br(exit)?;
        f.position_at_end(exit);
        f.phi(float, vec![(a, entry), (b, orphan)])?;
        f.ret(None)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();

    assert_eq!(converted.node_pool.len(), 2);
    assert!(node_by_name(&converted, "orphan").is_none());

    let entry = node(&converted, "entry.entry");
    let exit = node(&converted, "exit");
    assert_eq!(converted.node_pool[exit].pred, vec![entry]);
    let phi = &converted.node_pool[exit].ir.phi[0];
    assert_eq!(phi.incoming.len(), 1);
    assert_eq!(phi.incoming[0].node, entry);
}

#[test]
fn unnamed_blocks_are_numbered() {
    let module = function(|f| {
        let entry = f.add_block("");
        let next = f.add_block("");
        f.position_at_end(entry);
        f.br(next)?;
        f.position_at_end(next);
        f.ret(None)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(names(&converted), vec!["bb0.entry", "bb1"]);
}

#[test]
fn branch_to_missing_block_fails() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        f.position_at_end(entry);
        f.br(BlockId(9))?;
        Ok(())
    });
    assert!(matches!(convert_default(&module), Err(Error::UnknownBlock(9))));
}

#[test]
fn function_without_blocks_fails() {
    let module = function(|_| Ok(()));
    assert!(matches!(
        convert_default(&module),
        Err(Error::MalformedInstruction(_))
    ));
}

// ── Terminators ──

#[test]
fn switch_cases_carry_literals() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let fallback = f.add_block("default");
        let one = f.add_block("one");
        let seven = f.add_block("seven");
        let int = f.module().int_type(32);
        let selector = f.add_argument(int);
        let k1 = f.module().const_i32(1);
        let k2 = f.module().const_i32(2);
        let k7 = f.module().const_i32(7);

        f.position_at_end(entry);
        f.switch(selector, fallback, vec![(k1, one), (k7, seven), (k2, one)])?;
        for block in [fallback, one, seven] {
            f.position_at_end(block);
            f.ret(None)?;
        }
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let (entry, fallback, one, seven) = (
        node(&converted, "entry.entry"),
        node(&converted, "default"),
        node(&converted, "one"),
        node(&converted, "seven"),
    );
    let pool = &converted.node_pool;

    assert_eq!(pool[entry].succ, vec![fallback, one, seven]);
    assert_eq!(pool[one].pred, vec![entry]);
    let Some(Terminator::Switch {
        default, cases, ..
    }) = &pool[entry].ir.terminator
    else {
        panic!("entry does not end in a switch");
    };
    assert_eq!(*default, fallback);
    assert_eq!(
        cases,
        &vec![
            SwitchCase {
                literal: 1,
                node: one
            },
            SwitchCase {
                literal: 7,
                node: seven
            },
            SwitchCase {
                literal: 2,
                node: one
            },
        ]
    );
}

#[test]
fn phi_has_one_entry_per_predecessor_edge() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let fallback = f.add_block("default");
        let join = f.add_block("join");
        let int = f.module().int_type(32);
        let float = f.module().float_type();
        let selector = f.add_argument(int);
        let a = f.add_argument(float);
        let b = f.add_argument(float);
        let k1 = f.module().const_i32(1);
        let k2 = f.module().const_i32(2);

        f.position_at_end(entry);
        f.switch(selector, fallback, vec![(k1, join), (k2, join)])?;
        f.position_at_end(fallback);
        f.br(join)?;
        f.position_at_end(join);
        f.phi(float, vec![(a, entry), (a, entry), (b, fallback)])?;
        f.ret(None)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let (entry, fallback, join) = (
        node(&converted, "entry.entry"),
        node(&converted, "default"),
        node(&converted, "join"),
    );
    let pool = &converted.node_pool;

    assert_eq!(pool[join].pred, vec![entry, fallback]);
    let incoming: Vec<NodeId> = pool[join].ir.phi[0]
        .incoming
        .iter()
        .map(|edge| edge.node)
        .collect();
    assert_eq!(incoming, pool[join].pred);
    assert_ne!(
        pool[join].ir.phi[0].incoming[0].id,
        pool[join].ir.phi[0].incoming[1].id
    );
}

#[test]
fn switch_case_must_be_constant() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let exit = f.add_block("exit");
        let int = f.module().int_type(32);
        let selector = f.add_argument(int);
        let k0 = f.module().const_i32(0);

        f.position_at_end(entry);
        f.switch(selector, exit, vec![(k0, exit), (selector, exit)])?;
        f.position_at_end(exit);
        f.ret(None)?;
        Ok(())
    });
    assert!(matches!(
        convert_default(&module),
        Err(Error::NonConstantOperand {
            context: "switch",
            index: 2
        })
    ));
}

#[test]
fn return_value_and_unreachable() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let dead = f.add_block("dead");
        let done = f.add_block("done");
        let float = f.module().float_type();
        let a = f.add_argument(float);
        f.position_at_end(entry);
        let cmp = f.cmp(Predicate::FcmpOgt, a, a)?;
        f.cond_br(cmp, dead, done)?;
        f.position_at_end(dead);
        f.unreachable()?;
        f.position_at_end(done);
        f.ret(Some(a))?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let pool = &converted.node_pool;

    let dead = node(&converted, "dead");
    let done = node(&converted, "done");
    assert_eq!(pool[dead].ir.terminator, Some(Terminator::Unreachable));
    let entry_ops = &pool[node(&converted, "entry.entry")].ir.operations;
    let a = entry_ops[0].arguments[0];
    assert_eq!(pool[done].ir.terminator, Some(Terminator::Return(Some(a))));
}

#[test]
fn block_without_terminator_is_reported() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let float = f.module().float_type();
        let a = f.add_argument(float);
        f.position_at_end(entry);
        f.binary(BinaryOp::FAdd, a, a)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();

    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::UnsupportedTerminator {
            block: "entry".into(),
            opcode: "fadd".into()
        }]
    );
    assert_eq!(converted.node_pool[converted.entry].ir.terminator, None);
    assert!(matches!(
        convert_strict(&module),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn empty_block_is_reported() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let hole = f.add_block("hole");
        f.position_at_end(entry);
        f.br(hole)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    assert_eq!(
        converted.diagnostics,
        vec![Diagnostic::UnsupportedTerminator {
            block: "hole".into(),
            opcode: "<empty block>".into()
        }]
    );
}

// ── Rendering ──

#[test]
fn render_lists_nodes_in_visit_order() {
    let module = function(|f| {
        let entry = f.add_block("entry");
        let exit = f.add_block("exit");
        let float = f.module().float_type();
        let a = f.add_argument(float);
        f.position_at_end(entry);
        f.fneg(a)?;
        f.br(exit)?;
        f.position_at_end(exit);
        f.ret(None)?;
        Ok(())
    });
    let converted = convert_default(&module).unwrap();
    let text = converted.node_pool.render(&converted.visit_order);

    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "@0 entry.entry:");
    assert!(lines[1].trim_start().contains("OpFNegate"));
    assert_eq!(lines[2].trim(), "branch @1");
    assert_eq!(lines[3], "@1 exit:");
    assert_eq!(lines[4].trim(), "return");
}
