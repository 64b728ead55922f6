use calyx_lang::diagnostics::{emit_syntax_errors, report_eval_error};
use calyx_lang::language::parser::parse_program;
use calyx_lang::runtime::Evaluator;
use std::env;
use std::fs;
use std::io::Read;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: ./calyx-lang <filename.clx>  (or `-` for stdin)");
        process::exit(1);
    }

    let filename = &args[1];
    let source = if filename == "-" {
        let mut buffer = String::new();
        if let Err(err) = std::io::stdin().read_to_string(&mut buffer) {
            eprintln!("Failed to read stdin: {err}");
            process::exit(1);
        }
        buffer
    } else {
        if !filename.ends_with(".clx") {
            eprintln!("Invalid file extension. Only .clx files are allowed.");
            process::exit(1);
        }
        match fs::read_to_string(filename) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Failed to read {filename}: {err}");
                process::exit(1);
            }
        }
    };

    let (mut ast, roots) = match parse_program(&source) {
        Ok(parsed) => parsed,
        Err(errors) => {
            emit_syntax_errors(filename, &source, &errors);
            process::exit(1);
        }
    };

    let mut evaluator = Evaluator::new();
    for root in roots {
        match evaluator.evaluate(&mut ast, root) {
            Ok(value) => println!("{value}"),
            Err(err) => {
                report_eval_error(&err);
                process::exit(1);
            }
        }
    }
}
