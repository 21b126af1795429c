use tplcmd::config::Config;
use tplcmd::handler::HandlerRegistry;
use tplcmd::processor::{Outcome, TemplateProcessor};

fn expand_with(config: &Config, template: &str) -> String {
    let registry = HandlerRegistry::new();
    let mut processor = TemplateProcessor::new(&registry, config);
    let mut out = String::new();
    let outcome = processor.process_template_text(&mut out, template, None, true);
    assert_eq!(outcome, Outcome::Completed);
    out
}

fn expand(template: &str) -> String {
    expand_with(&Config::new(), template)
}

#[test]
fn test_literal_text_is_unchanged() {
    let text = "SELECT * FROM t WHERE a = '%' AND b = \"{\";\n";
    assert_eq!(expand(text), text);
    assert_eq!(expand(""), "");
}

#[test]
fn test_nested_block_resolves_before_outer_command() {
    assert_eq!(expand("{%if:{%getvar:x%}:yes:no%}"), "no");
    assert_eq!(expand("{%setvar:x:true%}{%if:{%getvar:x%}:yes:no%}"), "yes");
}

#[test_log::test]
fn test_unterminated_block_is_copied_literally() {
    assert_eq!(expand("abc{%foo"), "abc{%foo");
    assert_eq!(expand("a{%b:{%colon%}"), "a{%b:{%colon%}");
    assert_eq!(expand("{%colon%}x{%"), ":x{%");
}

#[test]
fn test_variables() {
    assert_eq!(expand("{%setvar:a:1%}{%getvar:a%}"), "1");
    assert_eq!(expand("{%setvar:a:1%}{%clearvar:a%}[{%getvar:a%}]"), "[]");
    assert_eq!(expand("{%setvar:a:1%}{%setvar:a%}[{%getvar:a%}]"), "[]");
    assert_eq!(
        expand("{%setvar:a:1%}{%setvar:b:2%}{%clearvars%}[{%getvar:a%}{%getvar:b%}]"),
        "[]"
    );
}

#[test]
fn test_setvar_keeps_colons_in_value() {
    assert_eq!(expand("{%setvar:t:12:30%}{%getvar:t%}"), "12:30");
}

#[test]
fn test_variables_persist_across_calls() {
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);

    let mut out = String::new();
    processor.process_template_text(&mut out, "{%setvar:name:EMPLOYEE%}", None, true);
    assert_eq!(out, "");
    assert_eq!(processor.get_var("name"), "EMPLOYEE");

    processor.process_template_text(&mut out, "{%getvar:name%}", None, true);
    assert_eq!(out, "EMPLOYEE");
}

#[test]
fn test_get_var_on_missing_name_does_not_insert() {
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);

    assert_eq!(processor.get_var("missing"), "");
    assert_eq!(processor.get_var("missing"), "");
    assert!(processor.vars().is_empty());

    processor.set_var("a", "1");
    processor.set_var("b", "2");
    processor.clear_var("a");
    assert_eq!(processor.get_var("a"), "");
    assert_eq!(processor.get_var("b"), "2");
    processor.clear_vars();
    assert!(processor.vars().is_empty());
}

#[test]
fn test_if_branches() {
    assert_eq!(expand("{%if:true:yes%}"), "yes");
    assert_eq!(expand("{%if:false:yes%}"), "");
    assert_eq!(expand("{%if:TRUE:yes:no%}"), "no");
}

#[test]
fn test_ifeq() {
    assert_eq!(expand("{%setvar:a:x%}{%ifeq:{%getvar:a%}:x:same:different%}"), "same");
    assert_eq!(expand("{%ifeq:x:y:same:different%}"), "different");
    assert_eq!(expand("{%ifeq:x:y:same%}"), "");
}

#[test]
fn test_not() {
    assert_eq!(expand("{%not:true%}"), "false");
    assert_eq!(expand("{%!:false%}"), "true");
    assert_eq!(expand("{%not:maybe%}"), "maybe");
    assert_eq!(expand("{%if:{%!:false%}:negated%}"), "negated");
}

#[test]
fn test_ifcontains() {
    assert_eq!(expand("{%ifcontains:a, b, c:b:YES:NO%}"), "YES");
    assert_eq!(expand("{%ifcontains:a, b, c:d:YES:NO%}"), "NO");
    assert_eq!(expand("{%ifcontains:ab, c:a:YES:NO%}"), "NO");
}

#[test]
fn test_forall_with_separator_and_placeholder() {
    assert_eq!(expand("{%forall:x,y,z:, :[%%current_value%%]%}"), "[x], [y], [z]");
}

#[test]
fn test_forall_omits_empty_results() {
    assert_eq!(
        expand("{%forall:a,b,c:, :{%ifeq:%%current_value%%:b::<%%current_value%%>%}%}"),
        "<a>, <c>"
    );
    assert_eq!(expand("{%forall::, :x%}"), "");
}

#[test]
fn test_forall_replaces_placeholder_after_expansion() {
    assert_eq!(
        expand("{%setvar:body:[%%current_value%%]%}{%forall:a,b:,:{%getvar:body%}%}"),
        "[a],[b]"
    );
}

#[test]
fn test_forall_expands_commands_inside_list_entries() {
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);
    processor.set_var("columns", "a,{%getvar:x%}");
    processor.set_var("x", "X");

    let mut out = String::new();
    processor.process_template_text(
        &mut out,
        "{%forall:{%getvar:columns%}:,:<%%current_value%%>%}",
        None,
        true,
    );
    assert_eq!(out, "<a>,<X>");
}

#[test]
fn test_multibyte_text_in_commands() {
    assert_eq!(expand("{%setvar:name:héllo%}{%getvar:name%}"), "héllo");
    assert_eq!(expand("{%setvar:größe:42%}{%getvar:größe%}"), "42");
    assert_eq!(expand("{%if:true:Größe:no%}"), "Größe");
    assert_eq!(expand("{%ifeq:é:é:ja:nein%}"), "ja");
    assert_eq!(expand("{%forall:ä,ö:, :«%%current_value%%»%}"), "«ä», «ö»");
    assert_eq!(expand("{%ifcontains:Ω, π:π:yes:no%}"), "yes");
    assert_eq!(expand("{%substr:héllo:1:2%}"), "él");
    assert_eq!(expand("{%uppercase:straße: ü%}"), "STRASSE: Ü");
}

#[test]
fn test_countall() {
    assert_eq!(expand("{%countall:a,b,c%}"), "3");
    assert_eq!(expand("{%countall:%}"), "0");
    assert_eq!(expand("{%setvar:l:x, y%}{%countall:{%getvar:l%}%}"), "2");
}

#[test]
fn test_substr() {
    assert_eq!(expand("{%substr:hello:2%}"), "llo");
    assert_eq!(expand("{%substr:hello:1:3%}"), "ell");
    assert_eq!(expand("{%substr:hello:x:2%}"), "he");
    assert_eq!(expand("{%substr:hello:10:2%}"), "");
}

#[test]
fn test_case_folding_keeps_colons() {
    assert_eq!(expand("{%uppercase:a:b%}"), "A:B");
    assert_eq!(expand("{%lowercase:MiXeD%}"), "mixed");
}

#[test]
fn test_alternate_is_per_processor() {
    let template = "{%alternate:odd:even%}{%alternate:odd:even%}{%alternate:odd:even%}";
    assert_eq!(expand(template), "oddevenodd");
    // A fresh processor starts over.
    assert_eq!(expand("{%alternate:odd:even%}"), "odd");
}

#[test]
fn test_colon_and_comment() {
    assert_eq!(expand("a{%colon%}b"), "a:b");
    assert_eq!(expand("a{%--:ignored: text%}b"), "ab");
    assert_eq!(expand("{%if:true:{%colon%}%}"), ":");
}

#[test]
fn test_unknown_command_without_handlers_is_silent() {
    assert_eq!(expand("a{%nosuch:x:y%}b"), "ab");
    assert_eq!(expand("a{%%}b"), "ab");
}

#[test]
fn test_tab_and_kw_follow_global_config() {
    assert_eq!(expand("{%tab%}|"), "    |");
    assert_eq!(expand("{%kw:select%}"), "SELECT");

    let mut config = Config::new();
    config.set("sqlEditorTabSize", "2");
    config.set("SQLKeywordsUpperCase", "false");
    assert_eq!(expand_with(&config, "{%tab%}|"), "  |");
    assert_eq!(expand_with(&config, "{%kw:SELECT%}"), "select");
}

#[test]
fn test_wrap() {
    assert_eq!(expand("{%wrap:aaa bbb ccc:7:2%}"), "aaa bbb\n  ccc");

    let mut config = Config::new();
    config.set("templateWrapWidth", "3");
    assert_eq!(expand_with(&config, "{%wrap:aa bb%}"), "aa\n    bb");
    assert_eq!(expand_with(&config, "{%wrap:aa bb:x:1%}"), "aa\n bb");
}

#[test]
fn test_getglobalconf() {
    let mut config = Config::new();
    config.set("DateFormat", "D.M.Y");
    assert_eq!(expand_with(&config, "[{%getglobalconf:DateFormat%}]"), "[D.M.Y]");
    assert_eq!(expand_with(&config, "[{%getglobalconf:Missing%}]"), "[]");
}

#[test]
fn test_getconf_and_setconf_without_file() {
    assert_eq!(expand("{%getconf:indent:{%tab%}%}|"), "    |");
    assert_eq!(expand("{%setconf:indent:--%}{%getconf:indent:x%}"), "--");
}

#[test]
fn test_parent_window() {
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config).with_parent_window("0x2a");
    let mut out = String::new();
    processor.process_template_text(&mut out, "[{%parent_window%}]", None, true);
    assert_eq!(out, "[0x2a]");

    assert_eq!(expand("[{%parent_window%}]"), "[]");
}

#[test_log::test]
fn test_abort_stops_expansion() {
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);

    let mut out = String::new();
    let outcome = processor.process_template_text(&mut out, "before{%abort%}after", None, true);
    assert_eq!(outcome, Outcome::Aborted);
    assert_eq!(out, "before");
}

#[test]
fn test_abort_unwinds_nested_expansion() {
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);

    let mut out = String::new();
    let outcome = processor.process_template_text(
        &mut out,
        "{%forall:a,b:,:{%if:true:x{%abort%}y%}%}tail",
        None,
        true,
    );
    assert!(outcome.is_aborted());
    assert!(!out.contains('y'));
    assert!(!out.contains("tail"));
    assert!(!out.contains(','));

    // The processor is usable again afterwards.
    let mut out = String::new();
    let outcome = processor.process_template_text(&mut out, "ok", None, true);
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(out, "ok");
}

#[test]
fn test_abort_in_setvar_leaves_variable_unset() {
    let registry = HandlerRegistry::new();
    let config = Config::new();
    let mut processor = TemplateProcessor::new(&registry, &config);

    let mut out = String::new();
    let outcome = processor.process_template_text(&mut out, "{%setvar:a:{%abort%}%}", None, true);
    assert!(outcome.is_aborted());
    assert_eq!(processor.get_var("a"), "");
}
