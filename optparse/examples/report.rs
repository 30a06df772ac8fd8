//! Shows the append, count and choice features on a fake report tool.
use optparse::{Action, Error, OptionParser, Outcome};

fn execute() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.usage("%prog [options] [section]...");
    parser
        .add_option(&["-v", "--verbose"])?
        .action(Action::Count)
        .dest("verbosity")
        .help("more -v means more chatter");
    parser
        .add_option(&["-I", "--include"])?
        .action(Action::Append)
        .dest("includes")
        .metavar("DIR")
        .help("add DIR to the search path (repeatable)");
    parser
        .add_option(&["--format"])?
        .choices(["plain", "json", "csv"])
        .set_default("plain")
        .help("output format: plain, json or csv");

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

    println!("verbosity: {}", parsed.get("verbosity").as_int());
    println!("format:    {}", parsed.get("format").as_str());
    for dir in parsed.get("includes").as_list() {
        println!("include:   {}", dir);
    }
    for section in parsed.args() {
        println!("section:   {}", section);
    }

    Ok(())
}

fn main() {
    if let Err(err) = execute() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
