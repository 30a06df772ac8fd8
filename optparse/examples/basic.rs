//! This is a basic example with help, version and error printing.
use optparse::{Action, Error, OptionParser, Outcome};

fn execute() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser
        .version("%prog 1.0")
        .description("concatenates its arguments, loudly if you ask");
    parser
        .add_option(&["-f", "--file"])?
        .dest("filename")
        .metavar("FILE")
        .help("write output to FILE");
    parser
        .add_option(&["-q", "--quiet"])?
        .action(Action::StoreFalse)
        .dest("verbose")
        .set_default("1")
        .help("don't print status messages to stdout");

    let parsed = match parser.parse_env() {
        Ok(Outcome::Done(parsed)) => parsed,
        Ok(Outcome::Help(text)) | Ok(Outcome::Version(text)) => {
            print!("{}", text);
            return Ok(());
        }
        Err(err) => {
            eprint!("{}", parser.format_error(&err));
            std::process::exit(2);
        }
    };

    if parsed.get("verbose").as_bool() {
        println!("writing to {:?}", parsed.get("filename").as_str());
    }
    println!("{}", parsed.args().join(" "));

    Ok(())
}

fn main() {
    if let Err(err) = execute() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
