use grammar::{ConversionError, Value, compile, tokenize};
use matcher::{LineError, LineMatch, TemplateRegistry, fold_sign_markers, match_template};

fn registry(templates: &[(&str, &str)]) -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    for (name, syntax) in templates {
        registry.register(name, syntax).expect("template compiles");
    }
    registry
}

fn parse(registry: &TemplateRegistry, line: &str) -> Option<LineMatch> {
    registry.parse_line(line).expect("well-formed line")
}

/// Arguments of the match, or `None` when no template matched.
fn args(templates: &[(&str, &str)], line: &str) -> Option<Vec<String>> {
    parse(&registry(templates), line)
        .map(|m| m.arg_strings().iter().map(|s| s.to_string()).collect())
}

fn strings(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

// ---------------------------------------------------------------------------
// Literals and placeholders
// ---------------------------------------------------------------------------

#[test]
fn assignment() {
    let templates = [("assign", "$ident_=_$value")];
    assert_eq!(args(&templates, "x = 5"), strings(&["x", "5"]));
    assert_eq!(args(&templates, "x=5"), strings(&["x", "5"]));
    assert_eq!(args(&templates, "speed  =  12.5"), strings(&["speed", "12.5"]));
    assert_eq!(args(&templates, "x == 5"), None);
    assert_eq!(args(&templates, "x = 5 6"), None);
}

#[test]
fn literal_blanks_in_template() {
    let templates = [("assign", "$ident = $value")];
    assert_eq!(args(&templates, "x = 5"), strings(&["x", "5"]));
    assert_eq!(args(&templates, "x == 5"), None);
    assert_eq!(args(&templates, "x=5"), None);
}

#[test]
fn literal_word() {
    let templates = [("quit", "quit")];
    assert_eq!(args(&templates, "quit"), strings(&[]));
    assert_eq!(args(&templates, "quits"), None);
    assert_eq!(args(&templates, "qui"), None);
    assert_eq!(args(&templates, "\"quit\""), None);
}

#[test]
fn ident_needs_a_name_start() {
    let templates = [("word", "$ident")];
    assert_eq!(args(&templates, "abc"), strings(&["abc"]));
    assert_eq!(args(&templates, "9lives"), strings(&["9lives"]));
    assert_eq!(args(&templates, "_hidden"), None);
    assert_eq!(args(&templates, ".5"), None);
    assert_eq!(args(&templates, "\"abc\""), None);
}

#[test]
fn value_takes_runs_and_quoted_strings() {
    let templates = [("set", "set_$value")];
    assert_eq!(args(&templates, "set 12.5"), strings(&["12.5"]));
    assert_eq!(args(&templates, "set _x"), strings(&["_x"]));
    assert_eq!(args(&templates, "set \"a b\""), strings(&["a b"]));
    assert_eq!(args(&templates, "set \"\""), strings(&[""]));
    assert_eq!(args(&templates, "set +"), None);
}

#[test]
fn placeholders_start_at_segment_boundaries() {
    let templates = [("set", "set$ident")];
    assert_eq!(args(&templates, "setspeed"), None);

    let templates = [("go", "go$value")];
    assert_eq!(args(&templates, "go5"), None);
    assert_eq!(args(&templates, "go\"5\""), strings(&["5"]));
}

#[test]
fn skip_blanks_is_optional() {
    let templates = [("call", "$ident_(_$value_)")];
    assert_eq!(args(&templates, "f(1)"), strings(&["f", "1"]));
    assert_eq!(args(&templates, "f ( 1 )"), strings(&["f", "1"]));
    assert_eq!(args(&templates, "f\t(\t1\t)"), strings(&["f", "1"]));
}

#[test]
fn escaped_characters() {
    let templates = [("tag", "$lbracket$ident$rbracket")];
    assert_eq!(args(&templates, "<b>"), strings(&["b"]));

    let templates = [("money", "$dollar$value")];
    assert_eq!(args(&templates, "$15"), strings(&["15"]));
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[test]
fn optional_group() {
    let templates = [("go", "go[ fast]")];
    assert_eq!(args(&templates, "go"), strings(&[]));
    assert_eq!(args(&templates, "go fast"), strings(&[]));
    assert_eq!(args(&templates, "go fast fast"), None);
    assert_eq!(args(&templates, "go slow"), None);
}

#[test]
fn repeatable_group() {
    let templates = [("abc", "a<b>c")];
    assert_eq!(args(&templates, "ac"), strings(&[]));
    assert_eq!(args(&templates, "abc"), strings(&[]));
    assert_eq!(args(&templates, "abbbbc"), strings(&[]));
    assert_eq!(args(&templates, "abd"), None);
}

#[test]
fn repeatable_group_collects_arguments() {
    let templates = [("sum", "sum<_$value>")];
    assert_eq!(args(&templates, "sum"), strings(&[]));
    assert_eq!(args(&templates, "sum 1 2 3"), strings(&["1", "2", "3"]));
}

#[test]
fn failed_group_discards_its_arguments() {
    let templates = [("pair", "$ident[_=_$value;]_$ident")];
    assert_eq!(args(&templates, "a = 1; b"), strings(&["a", "1", "b"]));
    // the group reads `b` before failing on `;`; that argument is rolled back
    assert_eq!(args(&templates, "a = b"), None);
    assert_eq!(args(&templates, "a b"), strings(&["a", "b"]));
}

#[test]
fn list_with_separators() {
    let templates = [("list", "list_$value<_,_$value>")];
    assert_eq!(args(&templates, "list 1"), strings(&["1"]));
    assert_eq!(args(&templates, "list 1, 2 ,3"), strings(&["1", "2", "3"]));
    assert_eq!(args(&templates, "list 1,"), None);
}

#[test]
fn group_that_consumes_nothing_terminates() {
    let templates = [("loop", "x<_>y")];
    assert_eq!(args(&templates, "xy"), strings(&[]));
    assert_eq!(args(&templates, "x   y"), strings(&[]));

    let templates = [("inject", "x<$arg(a)>")];
    assert_eq!(args(&templates, "x"), strings(&["a"]));
}

#[test]
fn constant_arguments_select_between_alternatives() {
    let templates = [("lamp", "lamp_[on$arg(1)][off$arg(0)]")];
    assert_eq!(args(&templates, "lamp on"), strings(&["1"]));
    assert_eq!(args(&templates, "lamp off"), strings(&["0"]));
    assert_eq!(args(&templates, "lamp"), strings(&[]));
    assert_eq!(args(&templates, "lamp dim"), None);
}

// ---------------------------------------------------------------------------
// Rest
// ---------------------------------------------------------------------------

#[test]
fn rest_drops_trailing_literals() {
    let templates = [("call", "func($rest)")];
    assert_eq!(args(&templates, "func(1,2,3)"), strings(&["1,2,3"]));
    assert_eq!(args(&templates, "func(a, \"b c\")"), strings(&["a, \"b c\""]));
}

#[test]
fn rest_keeps_everything_else() {
    let templates = [("say", "say $rest")];
    assert_eq!(args(&templates, "say hello world"), strings(&["hello world"]));
    assert_eq!(args(&templates, "say \"quoted\" text"), strings(&["\"quoted\" text"]));
    assert_eq!(args(&templates, "say"), None);
    assert_eq!(args(&templates, "say "), None);
}

#[test]
fn rest_continues_a_partly_consumed_run() {
    let templates = [("cmd", "cmd$rest")];
    assert_eq!(args(&templates, "cmdline x"), strings(&["line x"]));
}

// ---------------------------------------------------------------------------
// Sign folding
// ---------------------------------------------------------------------------

#[test]
fn negative_numbers() {
    let templates = [("number", "[-$arg(_minus)]$value")];
    assert_eq!(args(&templates, "-5"), strings(&["-5"]));
    assert_eq!(args(&templates, "5"), strings(&["5"]));

    let found = parse(&registry(&templates), "-2.5").unwrap();
    assert_eq!(found.arg_f64(0), Ok(-2.5));
    assert_eq!(found.arg_i32(0), Ok(-2));
}

#[test]
fn fold_sign_markers_prefixes_successor() {
    let mut arguments: Vec<Value> = ["a", "_minus", "3", "_minus"].map(Value::from).to_vec();
    fold_sign_markers(&mut arguments);
    assert_eq!(arguments, ["a", "-3", "_minus"].map(Value::from).to_vec());

    let mut arguments: Vec<Value> = ["_minus", "5"].map(Value::from).to_vec();
    fold_sign_markers(&mut arguments);
    assert_eq!(arguments, vec![Value::new("-5")]);

    let mut arguments: Vec<Value> = ["_minus", "_minus", "1"].map(Value::from).to_vec();
    fold_sign_markers(&mut arguments);
    assert_eq!(arguments, ["-_minus", "1"].map(Value::from).to_vec());
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn first_registered_template_wins() {
    let registry = registry(&[("quit", "quit"), ("word", "$ident")]);
    let found = parse(&registry, "quit").unwrap();
    assert_eq!(found.template(), "quit");
    assert_eq!(found.arg_count(), 0);

    let found = parse(&registry, "exit").unwrap();
    assert_eq!(found.template(), "word");
    assert_eq!(found.arg_str(0), Ok("exit"));

    assert_eq!(registry.names(), vec!["quit", "word"]);
    assert_eq!(registry.len(), 2);
    assert!(registry.get("word").is_some());
    assert!(registry.get("missing").is_none());
}

#[test]
fn duplicate_names_are_kept_in_order() {
    let registry = registry(&[("cmd", "a"), ("cmd", "b")]);
    assert_eq!(registry.len(), 2);
    assert_eq!(parse(&registry, "b").unwrap().template(), "cmd");
    assert_eq!(registry.get("cmd").unwrap().syntax(), "a");
}

#[test]
fn failed_template_is_not_registered() {
    let mut registry = TemplateRegistry::new();
    assert!(registry.register("broken", "a]").is_err());
    assert!(registry.is_empty());
}

#[test]
fn empty_line_is_an_error() {
    let registry = registry(&[("word", "$ident")]);
    assert_eq!(registry.parse_line(""), Err(LineError::Empty));
}

#[test]
fn unterminated_quote_is_an_error() {
    let registry = registry(&[("any", "$rest")]);
    assert!(matches!(registry.parse_line("say \"oops"), Err(LineError::Tokenize(_))));
}

#[test]
fn no_match_is_not_an_error() {
    let registry = registry(&[("word", "$ident")]);
    assert_eq!(registry.parse_line("a b"), Ok(None));
    assert_eq!(TemplateRegistry::new().parse_line("a"), Ok(None));
}

#[test]
fn match_template_without_registry() {
    let template = compile("assign", "$ident_=_$value").unwrap();
    let segments = tokenize("x = -5").unwrap();
    assert_eq!(match_template(&template, &segments), None);

    let segments = tokenize("x = 5").unwrap();
    assert_eq!(
        match_template(&template, &segments),
        Some(vec![Value::new("x"), Value::new("5")])
    );
}

#[test]
fn registry_is_shared_across_threads() {
    let registry = registry(&[("assign", "$ident_=_$value"), ("sum", "sum<_$value>")]);
    std::thread::scope(|scope| {
        for n in 0..4 {
            let registry = &registry;
            scope.spawn(move || {
                for i in 0..50 {
                    let line = format!("v{} = {}", n, i);
                    let found = registry.parse_line(&line).unwrap().unwrap();
                    assert_eq!(found.arg_u32(1), Ok(i));
                    let found = registry.parse_line("sum 1 2").unwrap().unwrap();
                    assert_eq!(found.template(), "sum");
                }
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Typed accessors
// ---------------------------------------------------------------------------

#[test]
fn typed_accessors() {
    let registry = registry(&[("set", "set<_$value>")]);
    let found = parse(&registry, "set on 12.5 70000 \"text\"").unwrap();

    assert_eq!(found.arg_bool(0), Ok(true));
    assert_eq!(found.arg_f32(1), Ok(12.5));
    assert_eq!(found.arg_i16(1), Ok(12));
    assert_eq!(found.arg_u64(1), Ok(12));
    assert!(matches!(found.arg_u16(2), Err(ConversionError::OutOfRange { .. })));
    assert!(matches!(found.arg_i16(2), Err(ConversionError::OutOfRange { .. })));
    assert_eq!(found.arg_i64(2), Ok(70000));
    assert_eq!(found.arg_str(3), Ok("text"));
    assert!(matches!(found.arg_bool(3), Err(ConversionError::Invalid { .. })));
    assert_eq!(found.arg_i32(9), Err(ConversionError::MissingArgument(9)));
    assert!(found.arg(9).is_none());
}

#[test]
fn negative_values_reject_unsigned_accessors() {
    let found = LineMatch::new("n", vec![Value::new("-3")]);
    assert_eq!(found.arg_i16(0), Ok(-3));
    assert_eq!(found.arg_i8(0), Ok(-3));
    assert!(matches!(found.arg_u32(0), Err(ConversionError::OutOfRange { .. })));
    assert!(matches!(found.arg_u8(0), Err(ConversionError::OutOfRange { .. })));
}

#[test]
fn line_match_display() {
    let found = LineMatch::new("assign", vec![Value::new("x"), Value::new("a b")]);
    assert_eq!(found.to_string(), "assign(\"x\", \"a b\")");
    assert_eq!(LineMatch::new("quit", Vec::new()).to_string(), "quit()");
    assert_eq!(found.into_arguments().len(), 2);
}
