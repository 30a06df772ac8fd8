use optparse::{Action, Error, OptionParser, Outcome, Parsed};

fn done(outcome: Outcome) -> Parsed {
    match outcome {
        Outcome::Done(parsed) => parsed,
        other => panic!("expected a completed parse, got {:?}", other),
    }
}

#[test]
fn test_register_lookup_roundtrip() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-f", "--file"])?.dest("filename");

    for args in [
        vec!["-f", "report.txt"],
        vec!["--file", "report.txt"],
        vec!["--file=report.txt"],
        vec!["-freport.txt"],
    ] {
        let parsed = done(parser.parse_args(args)?);
        assert_eq!(parsed.get("filename").as_str(), "report.txt");
    }
    Ok(())
}

#[test]
fn test_long_prefix_matching() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["--file"])?;
    parser.add_option(&["--format"])?;

    let parsed = done(parser.parse_args(["--fi", "a.txt", "--fo", "json"])?);
    assert_eq!(parsed.get("file").as_str(), "a.txt");
    assert_eq!(parsed.get("format").as_str(), "json");
    Ok(())
}

#[test]
fn test_exact_match_beats_prefix() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["--file"])?;
    parser.add_option(&["--filename"])?;

    let parsed = done(parser.parse_args(["--file", "short", "--filename", "long"])?);
    assert_eq!(parsed.get("file").as_str(), "short");
    assert_eq!(parsed.get("filename").as_str(), "long");
    Ok(())
}

#[test]
fn test_short_flag_bundling() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-a"])?.action(Action::StoreTrue);
    parser.add_option(&["-b"])?.action(Action::StoreTrue);
    parser.add_option(&["-c"])?.action(Action::StoreTrue);

    let bundled = done(parser.parse_args(["-abc"])?);
    let separate = done(parser.parse_args(["-a", "-b", "-c"])?);
    for dest in ["a", "b", "c"] {
        assert!(bundled.get(dest).as_bool());
        assert!(separate.get(dest).as_bool());
    }
    Ok(())
}

#[test]
fn test_bundled_flag_with_attached_value() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-v"])?.action(Action::StoreTrue);
    parser.add_option(&["-o"])?.dest("output");

    let parsed = done(parser.parse_args(["-voout.txt"])?);
    assert!(parsed.get("v").as_bool());
    assert_eq!(parsed.get("output").as_str(), "out.txt");
    Ok(())
}

#[test]
fn test_double_dash_freezes_scanning() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-n"])?.dest("number");

    let parsed = done(parser.parse_args(["-n", "23", "--", "-n", "42", "meh"])?);
    assert_eq!(parsed.get("number").as_str(), "23");
    assert_eq!(parsed.args(), ["-n", "42", "meh"]);
    Ok(())
}

#[test]
fn test_count_action() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser
        .add_option(&["-v", "--verbose"])?
        .action(Action::Count)
        .dest("verbosity");

    let parsed = done(parser.parse_args(["-v", "-v", "-v"])?);
    assert_eq!(parsed.get("verbosity").as_str(), "3");
    assert_eq!(parsed.get("verbosity").as_int(), 3);

    let parsed = done(parser.parse_args(["-vvv", "--verbose"])?);
    assert_eq!(parsed.get("verbosity").as_int(), 4);
    Ok(())
}

#[test]
fn test_count_starts_from_default() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser
        .add_option(&["-v"])?
        .action(Action::Count)
        .dest("verbosity")
        .set_default("5");

    let parsed = done(parser.parse_args(["-v"])?);
    assert_eq!(parsed.get("verbosity").as_int(), 6);
    Ok(())
}

#[test]
fn test_choice_stores_member() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["--mode"])?.choices(["a", "b"]);

    let parsed = done(parser.parse_args(["--mode=a"])?);
    assert_eq!(parsed.get("mode").as_str(), "a");
    Ok(())
}

#[test]
fn test_default_seeding() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-n"])?.dest("number").set_default("5");

    let parsed = done(parser.parse_args(Vec::<String>::new())?);
    assert!(parsed.is_set("number"));
    assert_eq!(parsed.values()["number"], *"5");
    assert_eq!(parsed.get("number").as_int(), 5);
    Ok(())
}

#[test]
fn test_set_defaults_overrides_option_default() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-n"])?.dest("number").set_default("5");
    parser.set_defaults("number", "7");

    let parsed = done(parser.parse_args(Vec::<String>::new())?);
    assert_eq!(parsed.get("number").as_int(), 7);

    // An actual match still wins over both.
    let parsed = done(parser.parse_args(["-n", "9"])?);
    assert_eq!(parsed.get("number").as_int(), 9);
    Ok(())
}

#[test]
fn test_leftover_ordering() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-v"])?.action(Action::StoreTrue);
    parser.add_option(&["--opt"])?;

    let parsed = done(parser.parse_args(["pos1", "-v", "pos2", "--opt", "val", "pos3"])?);
    assert!(parsed.get("v").as_bool());
    assert_eq!(parsed.get("opt").as_str(), "val");
    assert_eq!(parsed.args(), ["pos1", "pos2", "pos3"]);
    Ok(())
}

#[test]
fn test_lone_dash_is_positional() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-v"])?.action(Action::StoreTrue);

    let parsed = done(parser.parse_args(["-", "-v", "-"])?);
    assert!(parsed.get("v").as_bool());
    assert_eq!(parsed.args(), ["-", "-"]);
    Ok(())
}

#[test]
fn test_append_preserves_order() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser
        .add_option(&["-I", "--include"])?
        .action(Action::Append)
        .dest("includes");

    let parsed = done(parser.parse_args(["-I", "a", "--include=b", "-Ic"])?);
    assert_eq!(parsed.get("includes").as_list(), ["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_append_const() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser
        .add_option(&["--warn"])?
        .action(Action::AppendConst)
        .dest("flags")
        .set_const("warn");
    parser
        .add_option(&["--debug"])?
        .action(Action::AppendConst)
        .dest("flags")
        .set_const("debug");

    let parsed = done(parser.parse_args(["--warn", "--debug", "--warn"])?);
    assert_eq!(parsed.get("flags").as_list(), ["warn", "debug", "warn"]);
    Ok(())
}

#[test]
fn test_store_const_and_booleans() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser
        .add_option(&["--fast"])?
        .action(Action::StoreConst)
        .dest("speed")
        .set_const("9");
    parser
        .add_option(&["-q", "--quiet"])?
        .action(Action::StoreFalse)
        .dest("verbose")
        .set_default("1");

    let parsed = done(parser.parse_args(["--fast"])?);
    assert_eq!(parsed.get("speed").as_int(), 9);
    assert!(parsed.get("verbose").as_bool());

    let parsed = done(parser.parse_args(["-q"])?);
    assert!(!parsed.get("verbose").as_bool());
    Ok(())
}

#[test]
fn test_nargs_two() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-p", "--point"])?.nargs(2).dest("point");

    let parsed = done(parser.parse_args(["-p", "1", "2"])?);
    assert_eq!(parsed.get("point").as_list(), ["1", "2"]);

    // An attached value counts as the first of the two.
    let parsed = done(parser.parse_args(["--point=3", "4"])?);
    assert_eq!(parsed.get("point").as_list(), ["3", "4"]);
    Ok(())
}

#[test]
fn test_value_tokens_are_never_options() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.add_option(&["-o"])?.dest("output");
    parser.add_option(&["-v"])?.action(Action::StoreTrue);

    // The token after a value-taking option is consumed blindly.
    let parsed = done(parser.parse_args(["-o", "-v"])?);
    assert_eq!(parsed.get("output").as_str(), "-v");
    assert!(!parsed.get("v").as_bool());
    Ok(())
}

#[test]
fn test_help_outcome() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.prog("tool").description("does tool things");
    parser.add_option(&["-f", "--file"])?.help("input file");

    match parser.parse_args(["pos", "--help"])? {
        Outcome::Help(text) => {
            assert!(text.starts_with("Usage: tool [options]\n"));
            assert!(text.contains("does tool things"));
            assert!(text.contains("-f FILE, --file=FILE"));
            assert!(text.contains("input file"));
            assert!(text.contains("-h, --help"));
            assert!(text.contains("show this help message and exit"));
        }
        other => panic!("expected help, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_version_outcome() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser.prog("tool").version("%prog 1.0");

    match parser.parse_args(["--version"])? {
        Outcome::Version(text) => assert_eq!(text, "tool 1.0\n"),
        other => panic!("expected version, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_no_version_option_without_version_string() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    let err = parser.parse_args(["--version"]).unwrap_err();
    assert_eq!(err.to_string(), "no such option: --version");
    Ok(())
}

#[test]
fn test_user_help_option_wins() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    parser
        .add_option(&["-h", "--help"])?
        .action(Action::StoreTrue)
        .dest("help");

    let parsed = done(parser.parse_args(["--help"])?);
    assert!(parsed.get("help").as_bool());
    Ok(())
}

#[test]
fn test_prog_from_cmdline() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    match parser.parse_cmdline(["/usr/local/bin/tool", "--help"])? {
        Outcome::Help(text) => assert!(text.starts_with("Usage: tool [options]\n")),
        other => panic!("expected help, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_help_terminates_scanning() -> Result<(), Error> {
    let mut parser = OptionParser::new();
    // The unrecognized flag after --help is never reached.
    match parser.parse_args(["--help", "--nope"])? {
        Outcome::Help(_) => Ok(()),
        other => panic!("expected help, got {:?}", other),
    }
}
