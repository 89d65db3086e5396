//! Command-line entry point: load an image and run it, optionally attaching
//! the tracer or the interactive debugger as the observation subscriber.

use std::path::PathBuf;
use std::process;

use sigma16_emu::debug::Debugger;
use sigma16_emu::loader;
use sigma16_emu::memory::Memory;
use sigma16_emu::trace::Tracer;
use sigma16_emu::vm::Vm;

struct CliArgs {
    image: Option<PathBuf>,
    trace: bool,
    debug: bool,
}

fn print_usage() {
    eprintln!("usage: sigma16 <image> [--trace] [--debug]");
    eprintln!("  --trace   attach the tracer: print one line per instruction");
    eprintln!("  --debug   attach the interactive debugger");
}

fn parse_args() -> CliArgs {
    let mut args = CliArgs {
        image: None,
        trace: false,
        debug: false,
    };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--trace" => args.trace = true,
            "--debug" => args.debug = true,
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other if args.image.is_none() => args.image = Some(PathBuf::from(other)),
            other => {
                eprintln!("unrecognized argument: {other}");
                print_usage();
                process::exit(1);
            }
        }
    }

    args
}

fn main() {
    let cli = parse_args();

    let Some(image) = cli.image else {
        print_usage();
        process::exit(1);
    };

    let mut memory = Memory::new();
    if let Err(e) = loader::load_file(&image, &mut memory) {
        eprintln!("failed to load {}: {e}", image.display());
        process::exit(1);
    }

    let mut vm = Vm::new(memory);

    let result = if cli.debug {
        let mut debugger = Debugger::new();
        vm.run(Some(&mut debugger))
    } else if cli.trace {
        let mut tracer = Tracer::new();
        vm.run(Some(&mut tracer))
    } else {
        vm.run(None)
    };

    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1);
    }
}
