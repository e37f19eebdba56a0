use clap::{arg, value_parser, ArgMatches, Command};
use lang_lr::{
    Grammar, GrammarMode, GrammarSpec, LrParser, ParseTree, SetsGenerator, TableArtifacts,
    TableOptions,
};
use std::path::PathBuf;

fn command() -> ArgMatches {
    Command::new("lang-lr")
        .version(env!("CARGO_PKG_VERSION"))
        .about("LR parser generator: builds parsing tables from a grammar specification and drives parses for analysis and debugging.")
        .arg(
            arg!(-g --grammar <FILE> "Path to the JSON grammar specification")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-m --mode <MODE> "The parsing mode")
                .required(false)
                .value_parser(["LR0", "SLR1", "LALR1", "CLR1", "LL1"])
                .default_value("LALR1"),
        )
        .arg(
            arg!(-p --parse <STRING> "Parse the string and print the resulting parse tree")
                .required(false),
        )
        .arg(arg!(-t --table "Print the parsing table").required(false))
        .arg(arg!(-c --collection "Print the canonical collection").required(false))
        .arg(arg!(-s --sets "Print the First and Follow sets").required(false))
        .arg(
            arg!(-o --output <FILE> "Write the table artifacts to the file")
                .required(false)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(--loc "Capture token locations in the emitted artifacts").required(false))
        .arg(
            arg!(--"resolve-conflicts" "Resolve the conflicts precedence leaves open: shift wins a shift/reduce, the smaller production number wins a reduce/reduce")
                .required(false),
        )
        .arg(
            arg!(--"custom-tokenizer" <PATH> "Reference a custom tokenizer module in the artifacts instead of the lexical grammar")
                .required(false),
        )
        .get_matches()
}

fn main() {
    if let Err(message) = run(&command()) {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), String> {
    let grammar_path = matches.get_one::<PathBuf>("grammar").unwrap();
    let source = std::fs::read_to_string(grammar_path)
        .map_err(|err| format!("Cannot read grammar file {}: {}", grammar_path.display(), err))?;
    let mode: GrammarMode = matches.get_one::<String>("mode").unwrap().parse()?;

    let mut spec = GrammarSpec::from_json(&source).map_err(|err| err.to_string())?;
    if matches.get_flag("loc") {
        spec.capture_locations = true;
    }
    let grammar = Grammar::new(spec, mode).map_err(|err| err.to_string())?;

    if matches.get_flag("sets") {
        let sets = SetsGenerator::new(&grammar);
        println!("{}", sets);
    }

    let needs_automaton = matches.get_flag("table")
        || matches.get_flag("collection")
        || matches.contains_id("parse")
        || matches.contains_id("output");
    if !needs_automaton {
        return Ok(());
    }

    let options = TableOptions {
        resolve_conflicts: matches.get_flag("resolve-conflicts"),
    };
    let parser: LrParser<ParseTree> =
        LrParser::new(grammar, options).map_err(|err| err.to_string())?;

    if matches.get_flag("collection") {
        println!("{}", parser.collection().render(parser.grammar()));
    }
    if matches.get_flag("table") {
        println!("{}", parser.table().render(parser.grammar()));
        for conflict in parser.table().resolved_conflicts() {
            println!(
                "resolved {} conflict in state {} on {}: {}",
                conflict.kind, conflict.state, conflict.symbol, conflict.resolution
            );
        }
    }
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        let custom_tokenizer = matches
            .get_one::<String>("custom-tokenizer")
            .map(|path| path.as_str());
        let artifacts = TableArtifacts::encode(parser.grammar(), parser.table(), custom_tokenizer);
        artifacts
            .write_to(output)
            .map_err(|err| format!("Cannot write {}: {}", output.display(), err))?;
        println!("Table artifacts written to {}.", output.display());
    }
    if let Some(input) = matches.get_one::<String>("parse") {
        let value = parser.parse(input).map_err(|err| err.to_string())?;
        value.print().map_err(|err| err.to_string())?;
    }

    Ok(())
}
