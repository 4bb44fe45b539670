// Copyright (c) 2025 knix
// All rights reserved.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use inkwell::context::Context;
use inkwell::types::{AnyType, BasicTypeEnum};
use llgeneric::{GenericModule, GenericModuleConfig, TypeExpr};
use log::info;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run LLVM's verifier on every instantiated function, and on the module at the end
    #[arg(long, default_value_t = false)]
    verify: bool,

    /// Generic calls always emit a new callee instead of reusing a matching one
    #[arg(long, default_value_t = false)]
    no_dedup: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Write the LLVM IR here instead of printing it
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level: log::LevelFilter = args.log_level.into();
    let l = Box::leak(Box::new(
        env_logger::Builder::new().format_timestamp(None).filter_level(level).build(),
    ));
    log::set_logger(l)?;
    log::set_max_level(level);
    info!("{:#?}", args);

    let ctx = Context::create();
    let llvm_module = ctx.create_module("llgeneric_demo");
    let builder = ctx.create_builder();
    let config = GenericModuleConfig {
        verify_functions: args.verify,
        dedup_generic_calls: !args.no_dedup,
        ..Default::default()
    };
    let mut module =
        GenericModule::with_defaults(&ctx, &llvm_module, &builder).with_config(config);

    println!("{}", "Generic types".bold());
    // Pair<T> { T, T }
    let pair = module.add_generic_type("Pair", &["T"], false)?;
    let t = module.template(pair, "T")?;
    module.set_fields(pair, vec![t.into(), t.into()])?;
    let pair_args: [BasicTypeEnum; 2] = [ctx.i32_type().into(), ctx.f64_type().into()];
    for concrete in pair_args {
        let binding = module.bind(pair, &[concrete])?;
        let st = module.instantiate_type(pair, &binding)?;
        println!("  {}", st.print_to_string().to_string_lossy());
    }

    // Counter<T> { T } with a static `count: T` per instantiation
    let counter = module.add_generic_type("Counter", &["T"], false)?;
    let counter_t = module.template(counter, "T")?;
    module.set_fields(counter, vec![counter_t.into()])?;
    module.add_static_variable(counter, "count", counter_t.into())?;

    println!("{}", "Generic functions".bold());
    // Add<T>(a: T, b: T) -> T
    let add = module.add_function("Add", &["T"])?;
    {
        let mut b = module.function_builder(add)?;
        let t = b.template("T")?;
        b.set_parameters(vec![t.into(), t.into()])?;
        b.set_return_type(Some(t.into()))?;
        let entry = b.add_block("entry");
        b.position_at_end(entry)?;
        let (lhs, rhs) = (param(&b, 0)?, param(&b, 1)?);
        let sum = b.build_add(lhs, rhs, "sum")?;
        b.build_ret(sum)?;
    }

    // Bump<T>() -> T { Counter<T>::count = Add<T>(count, count) }
    let bump = module.add_function("Bump", &["T"])?;
    let bump_t = module.template(bump, "T")?;
    let owner = module.type_ref(counter, vec![bump_t.into()])?;
    {
        let mut b = module.function_builder(bump)?;
        b.set_return_type(Some(bump_t.into()))?;
        let entry = b.add_block("entry");
        b.position_at_end(entry)?;
        let current = b.build_static_load(owner.clone(), "count", "current")?;
        let next = b.build_generic_call(add, vec![bump_t.into()], &[current, current], "next")?;
        b.build_static_store(owner, "count", next)?;
        b.build_ret(next)?;
    }
    info!("defined {}", module.type_expr_to_string(&TypeExpr::from(bump_t).pointer()));

    let bump_args: [BasicTypeEnum; 2] = [ctx.i32_type().into(), ctx.i64_type().into()];
    for concrete in bump_args {
        let binding = module.bind(bump, &[concrete])?;
        let function = module.instantiate_function(bump, &binding)?;
        println!("  {}", function.get_name().to_string_lossy());
    }
    let stats = module.stats();
    println!(
        "{} {} types, {} cache hits, {} functions",
        "Stats".bold(),
        stats.types_materialized,
        stats.type_cache_hits,
        stats.functions_emitted
    );

    if args.verify {
        if let Err(e) = llvm_module.verify() {
            bail!("module failed verification: {}", e.to_string_lossy());
        }
        println!("{}", "Module verified".green());
    }

    match &args.out {
        Some(path) => {
            if let Err(e) = llvm_module.print_to_file(path) {
                bail!("could not write {}: {}", path.display(), e.to_string_lossy());
            }
            println!("Wrote {}", path.display());
        }
        None => println!("{}", llvm_module.print_to_string().to_string_lossy()),
    }
    Ok(())
}

fn param<'ctx>(
    b: &llgeneric::FunctionBuilder<'_, 'ctx>,
    index: usize,
) -> Result<llgeneric::Value<'ctx>> {
    match b.param(index) {
        Some(v) => Ok(v),
        None => bail!("no parameter {index}"),
    }
}
