//! claw driver: preprocess C sources and dump the token buffer.
//!
//! The first file is the main file; any further files become available for
//! `#include` under the name they were given on the command line.

mod tracing_setup;

use claw_lexer::LangOptions;
use claw_pp::Preprocessor;
use claw_source::SourceManager;
use claw_tokens::TokenCollector;

fn main() {
    tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();
    let mut lang_opts = LangOptions::c11();
    let mut paths = Vec::new();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--std=c89" => lang_opts = LangOptions::c89(),
            "--std=c99" => lang_opts = LangOptions::c99(),
            "--std=c11" => lang_opts = LangOptions::c11(),
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ if arg.starts_with("--") => {
                eprintln!("clawc: unknown option '{arg}'");
                std::process::exit(1);
            }
            _ => paths.push(arg.clone()),
        }
    }
    let Some((main_path, includes)) = paths.split_first() else {
        print_usage();
        std::process::exit(1);
    };

    let mut sm = SourceManager::new();
    for path in std::iter::once(main_path).chain(includes) {
        match std::fs::read_to_string(path) {
            Ok(text) => sm.provide_file(path, &text),
            Err(err) => {
                eprintln!("clawc: cannot read '{path}': {err}");
                std::process::exit(1);
            }
        }
    }

    let mut pp = match Preprocessor::new(sm, main_path, lang_opts) {
        Ok(pp) => pp,
        Err(err) => {
            eprintln!("clawc: {err}");
            std::process::exit(1);
        }
    };
    let collector = TokenCollector::new(&mut pp);
    if let Err(err) = pp.run() {
        let location = pp.source_manager().location_string(err.location());
        eprintln!("{location}: error: {err}");
        std::process::exit(1);
    }
    let buffer = collector.consume(&mut pp);
    print!("{}", buffer.dump_for_tests());
}

fn print_usage() {
    eprintln!("Usage: clawc [--std=c89|c99|c11] <main.c> [include files...]");
    eprintln!();
    eprintln!("Preprocesses the main file and prints the token buffer:");
    eprintln!("the expanded token stream, each file's spelled tokens, and");
    eprintln!("the mappings between them.");
}
