// Copyright (c) 2025 knix
// All rights reserved.

use inkwell::context::Context;
use inkwell::types::BasicTypeEnum;
use inkwell::values::{AnyValue, FunctionValue, InstructionOpcode};

use crate::error::ErrorKind;
use crate::function::GenericFunctionId;
use crate::module::{GenericModule, GenericModuleConfig};
use crate::ops::BinaryOp;
use crate::registry::InstanceFunc;
use crate::types::TypeExpr;
use crate::value::Value;

fn opcodes(function: FunctionValue<'_>) -> Vec<InstructionOpcode> {
    let mut out = Vec::new();
    for block in function.get_basic_blocks() {
        let mut next = block.get_first_instruction();
        while let Some(inst) = next {
            out.push(inst.get_opcode());
            next = inst.get_next_instruction();
        }
    }
    out
}

fn instruction_text(function: FunctionValue<'_>) -> Vec<String> {
    let mut out = Vec::new();
    for block in function.get_basic_blocks() {
        let mut next = block.get_first_instruction();
        while let Some(inst) = next {
            out.push(inst.print_to_string().to_string_lossy().trim().to_string());
            next = inst.get_next_instruction();
        }
    }
    out
}

fn fn_name(function: FunctionValue<'_>) -> String {
    function.get_name().to_string_lossy().into_owned()
}

/// Add<T>(a: T, b: T) -> T { a + b }
fn define_add(module: &mut GenericModule<'_, '_>) -> GenericFunctionId {
    let add = module.add_function("Add", &["T"]).unwrap();
    let mut b = module.function_builder(add).unwrap();
    let t = b.template("T").unwrap();
    b.set_parameters(vec![t.into(), t.into()]).unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let sum = b.build_add(b.param(0).unwrap(), b.param(1).unwrap(), "sum").unwrap();
    b.build_ret(sum).unwrap();
    add
}

#[test]
fn add_instantiates_per_binding() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("add_instantiates_per_binding");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let add = define_add(&mut module);

    let i32_binding = module.bind(add, &[ctx.i32_type().into()]).unwrap();
    let add_i32 = module.instantiate_function(add, &i32_binding).unwrap();
    assert_eq!(fn_name(add_i32), "Add<i32,i32>");
    assert_eq!(add_i32.count_params(), 2);
    assert_eq!(add_i32.get_type().get_return_type(), Some(ctx.i32_type().into()));
    assert_eq!(opcodes(add_i32), vec![InstructionOpcode::Add, InstructionOpcode::Return]);

    let i64_binding = module.bind(add, &[ctx.i64_type().into()]).unwrap();
    let add_i64 = module.instantiate_function(add, &i64_binding).unwrap();
    assert_eq!(fn_name(add_i64), "Add<i64,i64>");

    // Top-level instantiation always emits a fresh definition
    let again = module.instantiate_function(add, &i32_binding).unwrap();
    assert_ne!(again, add_i32);
    assert_eq!(module.stats().functions_emitted, 3);

    // Each instance reads its own parameters
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn integer_op_on_float_is_wrong_kind() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("integer_op_on_float_is_wrong_kind");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let add = define_add(&mut module);

    let binding = module.bind(add, &[ctx.f64_type().into()]).unwrap();
    let err = module.instantiate_function(add, &binding).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongKind);
    assert!(err.message.contains("add"));
}

#[test]
fn unterminated_block_emits_nothing() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("unterminated_block_emits_nothing");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);

    let f = module.add_function("Open", &[]).unwrap();
    let mut b = module.function_builder(f).unwrap();
    let entry = b.add_block("entry");
    let dangling = b.add_block("dangling");
    b.position_at_end(entry).unwrap();
    b.build_br(dangling).unwrap();

    let err = module.instantiate_function(f, &Default::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedBlock);
    assert!(err.message.contains("dangling"));
    assert!(llvm_module.get_first_function().is_none());
}

#[test]
fn value_used_before_definition_is_unresolved() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("value_used_before_definition_is_unresolved");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let i32_type = ctx.i32_type();

    let f = module.add_function("Backwards", &[]).unwrap();
    let mut b = module.function_builder(f).unwrap();
    b.set_return_type(Some(TypeExpr::concrete(i32_type))).unwrap();
    let early = b.add_block("early");
    let late = b.add_block("late");
    b.position_at_end(late).unwrap();
    let one = Value::constant(i32_type.const_int(1, false));
    let x = b.build_add(one, one, "x").unwrap();
    b.build_ret(x).unwrap();
    // Blocks replay in declaration order, so `early` runs before `x` exists
    b.position_at_end(early).unwrap();
    b.build_ret(x).unwrap();

    let err = module.instantiate_function(f, &Default::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnresolvedValue);
    assert!(err.message.contains("result of op"), "{}", err.message);
}

#[test]
fn generic_call_instantiates_callee() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("generic_call_instantiates_callee");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let add = define_add(&mut module);

    // Twice<U>(x: U) -> U { Add<U>(x, x) }
    let twice = module.add_function("Twice", &["U"]).unwrap();
    let mut b = module.function_builder(twice).unwrap();
    let u = b.template("U").unwrap();
    b.set_parameters(vec![u.into()]).unwrap();
    b.set_return_type(Some(u.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let x = b.param(0).unwrap();
    let r = b.build_generic_call(add, vec![u.into()], &[x, x], "r").unwrap();
    b.build_ret(r).unwrap();

    let binding = module.bind(twice, &[ctx.i16_type().into()]).unwrap();
    let twice_i16 = module.instantiate_function(twice, &binding).unwrap();
    assert_eq!(fn_name(twice_i16), "Twice<i16>");
    assert_eq!(opcodes(twice_i16), vec![InstructionOpcode::Call, InstructionOpcode::Return]);
    assert!(llvm_module.get_function("Add<i16,i16>").is_some());
    assert_eq!(module.stats().functions_emitted, 2);

    // The callee is reused the second time around
    module.instantiate_function(twice, &binding).unwrap();
    assert_eq!(module.stats().functions_emitted, 3);
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn generic_calls_without_dedup() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("generic_calls_without_dedup");
    let builder = ctx.create_builder();
    let config = GenericModuleConfig { dedup_generic_calls: false, ..Default::default() };
    let mut module =
        GenericModule::with_defaults(&ctx, &llvm_module, &builder).with_config(config);
    let add = define_add(&mut module);

    let caller = module.add_function("Caller", &[]).unwrap();
    let i32_type = ctx.i32_type();
    let mut b = module.function_builder(caller).unwrap();
    b.set_return_type(Some(TypeExpr::concrete(i32_type))).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let two = Value::constant(i32_type.const_int(2, false));
    let ty = TypeExpr::concrete(i32_type);
    let first = b.build_generic_call(add, vec![ty.clone()], &[two, two], "first").unwrap();
    let second = b.build_generic_call(add, vec![ty], &[first, two], "second").unwrap();
    b.build_ret(second).unwrap();

    module.instantiate_function(caller, &Default::default()).unwrap();
    assert_eq!(module.stats().functions_emitted, 3);
}

#[test]
fn self_recursive_generic_function_terminates() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("self_recursive_generic_function_terminates");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);

    // Spin<T>(x: T) -> T { Spin<T>(x) }
    let spin = module.add_function("Spin", &["T"]).unwrap();
    let mut b = module.function_builder(spin).unwrap();
    let t = b.template("T").unwrap();
    b.set_parameters(vec![t.into()]).unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let r = b.build_generic_call(spin, vec![t.into()], &[b.param(0).unwrap()], "r").unwrap();
    b.build_ret(r).unwrap();

    let binding = module.bind(spin, &[ctx.i8_type().into()]).unwrap();
    let spin_i8 = module.instantiate_function(spin, &binding).unwrap();
    assert_eq!(module.stats().functions_emitted, 1);
    let call = spin_i8.get_first_basic_block().unwrap().get_first_instruction().unwrap();
    assert_eq!(call.get_opcode(), InstructionOpcode::Call);
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn void_calls_are_unnamed() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("void_calls_are_unnamed");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let i32_type = ctx.i32_type();
    let sink = llvm_module.add_function(
        "sink",
        ctx.void_type().fn_type(&[i32_type.into()], false),
        None,
    );

    let f = module.add_function("Notify", &[]).unwrap();
    let mut b = module.function_builder(f).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    b.build_call(sink, &[Value::constant(i32_type.const_int(7, false))], "ignored").unwrap();
    b.build_ret_void().unwrap();

    let notify = module.instantiate_function(f, &Default::default()).unwrap();
    assert_eq!(opcodes(notify), vec![InstructionOpcode::Call, InstructionOpcode::Return]);
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn static_load_store_round_trip() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("static_load_store_round_trip");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);

    let counter = module.add_generic_type("Counter", &["T"], false).unwrap();
    let counter_t = module.template(counter, "T").unwrap();
    module.add_static_variable(counter, "count", counter_t.into()).unwrap();

    // Bump<T>() -> T { count = count + count; count }
    let bump = module.add_function("Bump", &["T"]).unwrap();
    let t = module.template(bump, "T").unwrap();
    let owner = module.type_ref(counter, vec![t.into()]).unwrap();
    let mut b = module.function_builder(bump).unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let current = b.build_static_load(owner.clone(), "count", "current").unwrap();
    let doubled = b.build_add(current, current, "doubled").unwrap();
    b.build_static_store(owner, "count", doubled).unwrap();
    b.build_ret(doubled).unwrap();

    let binding = module.bind(bump, &[ctx.i32_type().into()]).unwrap();
    let bump_i32 = module.instantiate_function(bump, &binding).unwrap();
    assert_eq!(
        opcodes(bump_i32),
        vec![
            InstructionOpcode::Load,
            InstructionOpcode::Add,
            InstructionOpcode::Store,
            InstructionOpcode::Return
        ]
    );
    // Instantiating the function materialized the owner and its global
    assert!(module.type_cache().get("Counter<i32>").is_some());
    assert!(llvm_module.get_global("Counter<i32>::count").is_some());
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn memory_ops_replay() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("memory_ops_replay");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let i32_type = ctx.i32_type();

    let pair = module.add_generic_type("Pair", &["T"], false).unwrap();
    let pair_t = module.template(pair, "T").unwrap();
    module.set_fields(pair, vec![pair_t.into(), pair_t.into()]).unwrap();

    // Second<T>(a: T, b: T) -> T { p = alloca Pair<T>; p.1 = b; load p.1 }
    let second = module.add_function("Second", &["T"]).unwrap();
    let t = module.template(second, "T").unwrap();
    let pair_of_t: TypeExpr = module.type_ref(pair, vec![t.into()]).unwrap().into();
    let mut b = module.function_builder(second).unwrap();
    b.set_parameters(vec![t.into(), t.into()]).unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let p = b.build_alloca(pair_of_t.clone(), "p").unwrap();
    let slot = b.build_struct_gep(pair_of_t.clone(), p, 1, "slot").unwrap();
    b.build_store(b.param(1).unwrap(), slot).unwrap();
    let zero = Value::constant(i32_type.const_zero());
    let first = b.build_in_bounds_gep(pair_of_t, p, &[zero, zero], "first").unwrap();
    b.build_store(b.param(0).unwrap(), first).unwrap();
    let heap = b.build_array_malloc(t.into(), Value::constant(i32_type.const_int(4, false)), "heap").unwrap();
    b.build_free(heap).unwrap();
    let loaded = b.build_load(t.into(), slot, "loaded").unwrap();
    b.build_ret(loaded).unwrap();

    let binding = module.bind(second, &[ctx.f32_type().into()]).unwrap();
    let second_f32 = module.instantiate_function(second, &binding).unwrap();
    let ops = opcodes(second_f32);
    assert_eq!(ops[0], InstructionOpcode::Alloca);
    assert!(ops.contains(&InstructionOpcode::GetElementPtr));
    assert!(ops.contains(&InstructionOpcode::Call)); // malloc and free
    assert_eq!(ops.last(), Some(&InstructionOpcode::Return));
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn virtual_calls_go_through_registry() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("virtual_calls_go_through_registry");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let i32_type = ctx.i32_type();
    let i64_type = ctx.i64_type();

    let hash_i32 = llvm_module.add_function("hash_i32", i64_type.fn_type(&[i32_type.into()], false), None);
    module.register_instance_func(i32_type.into(), "hash", InstanceFunc::Concrete(hash_i32));

    // Hash<T>(x: T) -> i64 { x.hash() }
    let hash = module.add_function("Hash", &["T"]).unwrap();
    let mut b = module.function_builder(hash).unwrap();
    let t = b.template("T").unwrap();
    b.set_parameters(vec![t.into()]).unwrap();
    b.set_return_type(Some(TypeExpr::concrete(i64_type))).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let h = b.build_virtual_call(t.into(), "hash", &[b.param(0).unwrap()], "h").unwrap();
    b.build_ret(h).unwrap();

    let binding = module.bind(hash, &[i32_type.into()]).unwrap();
    let hash_of_i32 = module.instantiate_function(hash, &binding).unwrap();
    let call = hash_of_i32.get_first_basic_block().unwrap().get_first_instruction().unwrap();
    assert_eq!(call.get_opcode(), InstructionOpcode::Call);
    assert!(hash_of_i32.verify(false));

    let binding = module.bind(hash, &[ctx.f64_type().into()]).unwrap();
    let err = module.instantiate_function(hash, &binding).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingInstanceFunc);

    let generic_hash = define_add(&mut module);
    module.register_instance_func(i64_type.into(), "hash", InstanceFunc::Generic(generic_hash));
    let binding = module.bind(hash, &[i64_type.into()]).unwrap();
    let err = module.instantiate_function(hash, &binding).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongKind);
}

#[test]
fn virtual_generic_call_instantiates_registered_function() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("virtual_generic_call_instantiates_registered_function");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let i32_type = ctx.i32_type();
    let add = define_add(&mut module);
    module.register_instance_func(i32_type.into(), "combine", InstanceFunc::Generic(add));

    // Combine<T>(x: T) -> T { x.combine<T>(x, x) }
    let combine = module.add_function("Combine", &["T"]).unwrap();
    let mut b = module.function_builder(combine).unwrap();
    let t = b.template("T").unwrap();
    b.set_parameters(vec![t.into()]).unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let x = b.param(0).unwrap();
    let r = b.build_virtual_generic_call(t.into(), "combine", vec![t.into()], &[x, x], "r").unwrap();
    b.build_ret(r).unwrap();

    let binding = module.bind(combine, &[i32_type.into()]).unwrap();
    module.instantiate_function(combine, &binding).unwrap();
    assert!(llvm_module.get_function("Add<i32,i32>").is_some());
    assert!(llvm_module.verify().is_ok());

    let concrete = llvm_module.add_function("combine_i8", ctx.i8_type().fn_type(&[], false), None);
    module.register_instance_func(ctx.i8_type().into(), "combine", InstanceFunc::Concrete(concrete));
    let binding = module.bind(combine, &[ctx.i8_type().into()]).unwrap();
    let err = module.instantiate_function(combine, &binding).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongKind);
}

#[test]
fn switch_replays_all_cases() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("switch_replays_all_cases");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let i32_type = ctx.i32_type();
    let int = |n: u64| Value::constant(i32_type.const_int(n, false));

    let f = module.add_function("Classify", &[]).unwrap();
    let mut b = module.function_builder(f).unwrap();
    b.set_parameters(vec![TypeExpr::concrete(i32_type)]).unwrap();
    b.set_return_type(Some(TypeExpr::concrete(i32_type))).unwrap();
    let entry = b.add_block("entry");
    let one = b.add_block("one");
    let two = b.add_block("two");
    let other = b.add_block("other");
    b.position_at_end(entry).unwrap();
    let handle = b.build_switch(b.param(0).unwrap(), other).unwrap();
    b.add_switch_case(handle, int(1), one).unwrap();
    b.add_switch_case(handle, int(2), two).unwrap();
    for (block, result) in [(one, 10), (two, 20), (other, 0)] {
        b.position_at_end(block).unwrap();
        b.build_ret(int(result)).unwrap();
    }

    let classify = module.instantiate_function(f, &Default::default()).unwrap();
    let ops = opcodes(classify);
    assert_eq!(ops[0], InstructionOpcode::Switch);
    assert_eq!(ops.iter().filter(|op| **op == InstructionOpcode::Return).count(), 3);
    assert_eq!(classify.count_basic_blocks(), 4);
    let switch = classify.get_first_basic_block().unwrap().get_terminator().unwrap();
    // condition, default, then a (value, dest) pair per case
    assert_eq!(switch.get_num_operands(), 6);
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn indirect_branch_to_block_address() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("indirect_branch_to_block_address");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);

    let f = module.add_function("Jump", &[]).unwrap();
    let mut b = module.function_builder(f).unwrap();
    let entry = b.add_block("entry");
    let dispatch = b.add_block("dispatch");
    let target = b.add_block("target");
    b.position_at_end(entry).unwrap();
    b.build_br(dispatch).unwrap();
    b.position_at_end(dispatch).unwrap();
    let handle = b.build_indirect_br(Value::block_address(target)).unwrap();
    b.add_indirect_destination(handle, target).unwrap();
    b.position_at_end(target).unwrap();
    b.build_ret_void().unwrap();

    let jump = module.instantiate_function(f, &Default::default()).unwrap();
    assert_eq!(
        opcodes(jump),
        vec![InstructionOpcode::Br, InstructionOpcode::IndirectBr, InstructionOpcode::Return]
    );
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn comparisons_feed_conditional_branches() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("comparisons_feed_conditional_branches");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);

    // Max<T>(a: T, b: T) -> T over floats
    let max = module.add_function("Max", &["T"]).unwrap();
    let mut b = module.function_builder(max).unwrap();
    let t = b.template("T").unwrap();
    b.set_parameters(vec![t.into(), t.into()]).unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    let take_a = b.add_block("take_a");
    let take_b = b.add_block("take_b");
    let (a, rhs) = (b.param(0).unwrap(), b.param(1).unwrap());
    b.position_at_end(entry).unwrap();
    let gt = b.build_fcmp(inkwell::FloatPredicate::OGT, a, rhs, "gt").unwrap();
    b.build_cond_br(gt, take_a, take_b).unwrap();
    b.position_at_end(take_a).unwrap();
    b.build_ret(a).unwrap();
    b.position_at_end(take_b).unwrap();
    b.build_ret(rhs).unwrap();

    let binding = module.bind(max, &[ctx.f64_type().into()]).unwrap();
    let max_f64 = module.instantiate_function(max, &binding).unwrap();
    assert_eq!(
        opcodes(max_f64),
        vec![
            InstructionOpcode::FCmp,
            InstructionOpcode::Br,
            InstructionOpcode::Return,
            InstructionOpcode::Return
        ]
    );
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn verification_rejects_bad_functions() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("verification_rejects_bad_functions");
    let builder = ctx.create_builder();
    let config = GenericModuleConfig { verify_functions: true, ..Default::default() };
    let mut module =
        GenericModule::with_defaults(&ctx, &llvm_module, &builder).with_config(config);
    let i32_type = ctx.i32_type();

    // Declared to return i32 but returns nothing
    let bad = module.add_function("Bad", &[]).unwrap();
    let mut b = module.function_builder(bad).unwrap();
    b.set_return_type(Some(TypeExpr::concrete(i32_type))).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    b.build_ret_void().unwrap();

    let err = module.instantiate_function(bad, &Default::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidFunction);

    let add = define_add(&mut module);
    let binding = module.bind(add, &[i32_type.into()]).unwrap();
    assert!(module.instantiate_function(add, &binding).is_ok());
}

#[test]
fn builder_position_is_restored() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("builder_position_is_restored");
    let builder = ctx.create_builder();
    let host = llvm_module.add_function("host", ctx.void_type().fn_type(&[], false), None);
    let host_entry = ctx.append_basic_block(host, "entry");
    builder.position_at_end(host_entry);

    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let add = define_add(&mut module);
    let binding = module.bind(add, &[ctx.i32_type().into()]).unwrap();
    module.instantiate_function(add, &binding).unwrap();

    assert_eq!(builder.get_insert_block(), Some(host_entry));
}

#[test]
fn generic_calls_are_cached_per_template_binding() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("generic_calls_are_cached_per_template_binding");
    let builder = ctx.create_builder();
    let config = GenericModuleConfig { verify_functions: true, ..Default::default() };
    let mut module =
        GenericModule::with_defaults(&ctx, &llvm_module, &builder).with_config(config);
    let (i32_type, i64_type) = (ctx.i32_type(), ctx.i64_type());

    // Zero<T>() -> T; T only shows up in the return type, so every binding mangles alike
    let zero = module.add_function("Zero", &["T"]).unwrap();
    let mut b = module.function_builder(zero).unwrap();
    let t = b.template("T").unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let slot = b.build_alloca(t.into(), "slot").unwrap();
    let value = b.build_load(t.into(), slot, "value").unwrap();
    b.build_ret(value).unwrap();

    let both = module.add_function("Both", &[]).unwrap();
    let mut b = module.function_builder(both).unwrap();
    b.set_return_type(Some(TypeExpr::concrete(i64_type))).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    b.build_generic_call(zero, vec![TypeExpr::concrete(i32_type)], &[], "small").unwrap();
    let wide = b.build_generic_call(zero, vec![TypeExpr::concrete(i64_type)], &[], "wide").unwrap();
    b.build_generic_call(zero, vec![TypeExpr::concrete(i32_type)], &[], "again").unwrap();
    b.build_ret(wide).unwrap();

    let both_fn = module.instantiate_function(both, &Default::default()).unwrap();
    // Both, Zero<i32>, Zero<i64>; the third call reuses Zero<i32>
    assert_eq!(module.stats().functions_emitted, 3);
    let calls: Vec<String> =
        instruction_text(both_fn).into_iter().filter(|i| i.contains("call")).collect();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].contains("call i32"), "{}", calls[0]);
    assert!(calls[1].contains("call i64"), "{}", calls[1]);
    assert!(calls[2].contains("call i32"), "{}", calls[2]);
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn failed_callee_is_not_reused() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("failed_callee_is_not_reused");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let add = define_add(&mut module);

    // Twice<U>(x: U) -> U { Add<U>(x, x) }
    let twice = module.add_function("Twice", &["U"]).unwrap();
    let mut b = module.function_builder(twice).unwrap();
    let u = b.template("U").unwrap();
    b.set_parameters(vec![u.into()]).unwrap();
    b.set_return_type(Some(u.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let x = b.param(0).unwrap();
    let r = b.build_generic_call(add, vec![u.into()], &[x, x], "r").unwrap();
    b.build_ret(r).unwrap();

    // Add<double> fails on its integer add, both times
    let binding = module.bind(twice, &[ctx.f64_type().into()]).unwrap();
    let err = module.instantiate_function(twice, &binding).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongKind);
    let err = module.instantiate_function(twice, &binding).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongKind);
    assert_eq!(module.stats().functions_emitted, 4);

    // A good binding afterwards still goes through
    let binding = module.bind(twice, &[ctx.i16_type().into()]).unwrap();
    module.instantiate_function(twice, &binding).unwrap();
    assert_eq!(module.stats().functions_emitted, 6);
}

#[test]
fn not_xors_against_all_ones() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("not_xors_against_all_ones");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);

    // Flip<T>(x: T) -> T { ~x }
    let flip = module.add_function("Flip", &["T"]).unwrap();
    let mut b = module.function_builder(flip).unwrap();
    let t = b.template("T").unwrap();
    b.set_parameters(vec![t.into()]).unwrap();
    b.set_return_type(Some(t.into())).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let flipped = b.build_not(b.param(0).unwrap(), "flipped").unwrap();
    b.build_ret(flipped).unwrap();

    for (concrete, width) in [(ctx.i8_type(), "i8"), (ctx.i64_type(), "i64")] {
        let binding = module.bind(flip, &[concrete.into()]).unwrap();
        let flip_fn = module.instantiate_function(flip, &binding).unwrap();
        assert_eq!(opcodes(flip_fn), vec![InstructionOpcode::Xor, InstructionOpcode::Return]);
        let xor = &instruction_text(flip_fn)[0];
        // All ones prints as -1 at every width
        assert!(xor.contains(&format!("xor {} %0, -1", width)), "{}", xor);
    }

    let binding = module.bind(flip, &[ctx.f32_type().into()]).unwrap();
    let err = module.instantiate_function(flip, &binding).unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongKind);
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn binary_ops_replay_with_their_flags() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("binary_ops_replay_with_their_flags");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);

    let table = [
        (BinaryOp::Sub, InstructionOpcode::Sub),
        (BinaryOp::Mul, InstructionOpcode::Mul),
        (BinaryOp::NswAdd, InstructionOpcode::Add),
        (BinaryOp::NuwAdd, InstructionOpcode::Add),
        (BinaryOp::NswSub, InstructionOpcode::Sub),
        (BinaryOp::NuwSub, InstructionOpcode::Sub),
        (BinaryOp::NswMul, InstructionOpcode::Mul),
        (BinaryOp::NuwMul, InstructionOpcode::Mul),
        (BinaryOp::SDiv, InstructionOpcode::SDiv),
        (BinaryOp::UDiv, InstructionOpcode::UDiv),
        (BinaryOp::ExactSDiv, InstructionOpcode::SDiv),
        (BinaryOp::SRem, InstructionOpcode::SRem),
        (BinaryOp::URem, InstructionOpcode::URem),
        (BinaryOp::And, InstructionOpcode::And),
        (BinaryOp::Or, InstructionOpcode::Or),
        (BinaryOp::Xor, InstructionOpcode::Xor),
        (BinaryOp::Shl, InstructionOpcode::Shl),
        (BinaryOp::LShr, InstructionOpcode::LShr),
        (BinaryOp::AShr, InstructionOpcode::AShr),
        (BinaryOp::FAdd, InstructionOpcode::FAdd),
        (BinaryOp::FSub, InstructionOpcode::FSub),
        (BinaryOp::FMul, InstructionOpcode::FMul),
        (BinaryOp::FDiv, InstructionOpcode::FDiv),
        (BinaryOp::FRem, InstructionOpcode::FRem),
    ];
    for (index, (op, opcode)) in table.into_iter().enumerate() {
        // Op<T>(a: T, b: T) -> T { a <op> b }
        let f = module.add_function(&format!("Op{}", index), &["T"]).unwrap();
        let mut b = module.function_builder(f).unwrap();
        let t = b.template("T").unwrap();
        b.set_parameters(vec![t.into(), t.into()]).unwrap();
        b.set_return_type(Some(t.into())).unwrap();
        let entry = b.add_block("entry");
        b.position_at_end(entry).unwrap();
        let r = b.build_binary(op, b.param(0).unwrap(), b.param(1).unwrap(), "r").unwrap();
        b.build_ret(r).unwrap();

        let (concrete, type_text): (BasicTypeEnum, &str) = if op.is_float() {
            (ctx.f64_type().into(), "double")
        } else {
            (ctx.i32_type().into(), "i32")
        };
        let binding = module.bind(f, &[concrete]).unwrap();
        let function = module.instantiate_function(f, &binding).unwrap();
        assert_eq!(opcodes(function), vec![opcode, InstructionOpcode::Return], "{:?}", op);
        let text = &instruction_text(function)[0];
        let expected = format!("%r = {} {} %0, %1", op.mnemonic(), type_text);
        assert_eq!(text, &expected);
    }
    assert!(llvm_module.verify().is_ok());
}

#[test]
fn array_alloca_and_plain_gep_replay() {
    let ctx = Context::create();
    let llvm_module = ctx.create_module("array_alloca_and_plain_gep_replay");
    let builder = ctx.create_builder();
    let mut module = GenericModule::with_defaults(&ctx, &llvm_module, &builder);
    let i32_type = ctx.i32_type();

    // Slots<T>(n: i32, x: T) { p = alloca T, n; q = gep T, p, n; *q = x }
    let slots = module.add_function("Slots", &["T"]).unwrap();
    let mut b = module.function_builder(slots).unwrap();
    let t = b.template("T").unwrap();
    b.set_parameters(vec![TypeExpr::concrete(i32_type), t.into()]).unwrap();
    let entry = b.add_block("entry");
    b.position_at_end(entry).unwrap();
    let n = b.param(0).unwrap();
    let p = b.build_array_alloca(t.into(), n, "p").unwrap();
    let q = b.build_gep(t.into(), p, &[n], "q").unwrap();
    b.build_store(b.param(1).unwrap(), q).unwrap();
    b.build_ret_void().unwrap();

    let binding = module.bind(slots, &[ctx.i16_type().into()]).unwrap();
    let slots_i16 = module.instantiate_function(slots, &binding).unwrap();
    assert_eq!(
        opcodes(slots_i16),
        vec![
            InstructionOpcode::Alloca,
            InstructionOpcode::GetElementPtr,
            InstructionOpcode::Store,
            InstructionOpcode::Return
        ]
    );
    let text = instruction_text(slots_i16);
    assert!(text[0].starts_with("%p = alloca i16, i32 %0"), "{}", text[0]);
    assert!(text[1].starts_with("%q = getelementptr i16, ptr %p, i32 %0"), "{}", text[1]);
    assert!(llvm_module.verify().is_ok());
}
