use doc_analyst::{config::Config, normalize};

#[test]
fn canonicalize_composes_unicode_and_line_endings() {
    // "e" + combining acute accent becomes the precomposed form.
    let out = normalize::canonicalize("caf\u{0065}\u{0301}\r\n数据");
    assert_eq!(out, "caf\u{00e9}\n数据");
}

#[test]
fn tidy_strips_control_chars_but_keeps_layout() {
    let cfg = Config::default();
    let out = normalize::tidy_extracted(&cfg.text, "Alpha\u{0002}Beta   \r\nLine\tTabbed\u{0007}").unwrap();
    assert_eq!(out, "AlphaBeta\nLine\tTabbed");
}

#[test]
fn tidy_collapses_long_blank_runs() {
    let cfg = Config::default();
    let out = normalize::tidy_extracted(&cfg.text, "one\n\n\n\n\n\ntwo\n\nthree").unwrap();
    assert_eq!(out, "one\n\n\ntwo\n\nthree");
}

#[test]
fn tidy_can_be_disabled() {
    let mut cfg = Config::default();
    cfg.text.collapse_blank_lines = false;
    cfg.text.trim_trailing_whitespace = false;
    let out = normalize::tidy_extracted(&cfg.text, "a  \n\n\n\n\nb").unwrap();
    assert_eq!(out, "a  \n\n\n\n\nb");
}
