//! Renderer for tribute bodies. Visitors write a small verse markup, not
//! HTML: blank-line-separated stanzas, `>`-prefixed quote blocks, and
//! `**strong**` / `//emphasis//` inline formatting. Everything textual is
//! escaped on the way out, so the stored HTML is safe to embed directly.
use askama_escape::{escape, Html};
use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser;
use std::fmt::Write;

#[derive(Parser)]
#[grammar = "verse/verse.pest"]
pub struct VerseParser;

pub type ParseError = Box<pest::error::Error<Rule>>;
type ParseResult = Result<String, ParseError>;

pub fn to_html(text: &str) -> ParseResult {
    Ok(rendered(
        VerseParser::parse(Rule::document, text).map_err(Box::new)?,
    ))
}

fn rendered(pairs: Pairs<Rule>) -> String {
    let mut html = String::new();
    for pair in pairs {
        if pair.as_rule() == Rule::document {
            for block in pair.into_inner() {
                match block.as_rule() {
                    Rule::stanza => {
                        html.push_str("<p>");
                        push_lines(block.into_inner(), &mut html);
                        html.push_str("</p>");
                    }
                    Rule::quote => {
                        html.push_str("<blockquote>");
                        push_lines(block.into_inner(), &mut html);
                        html.push_str("</blockquote>");
                    }
                    Rule::EOI => (),
                    rule => unreachable!("unexpected block rule: {:?}", rule),
                }
            }
        }
    }
    html
}

/// Lines within a block keep their breaks.
fn push_lines(lines: Pairs<Rule>, html: &mut String) {
    let mut first = true;
    for line in lines {
        if !first {
            html.push_str("<br />");
        }
        first = false;
        // A quote line may be empty, in which case it has no inline pair.
        for inline in line.into_inner() {
            push_inline(inline.into_inner(), html);
        }
    }
}

fn push_inline(nodes: Pairs<Rule>, html: &mut String) {
    for node in nodes {
        match node.as_rule() {
            Rule::strong => {
                html.push_str("<strong>");
                push_inline(node.into_inner(), html);
                html.push_str("</strong>");
            }
            Rule::em => {
                html.push_str("<em>");
                push_inline(node.into_inner(), html);
                html.push_str("</em>");
            }
            Rule::text => {
                write!(html, "{}", escape(node.as_str(), Html)).expect("escaping can't fail");
            }
            // Unmatched markers come through literally.
            Rule::star => html.push_str("**"),
            Rule::slash => html.push_str("//"),
            rule => unreachable!("unexpected inline rule: {:?}", rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), ParseError>;

    // The parse tree shape isn't part of the contract; the HTML output is,
    // so that's what the assertions pin down.

    /// Macro to check that an assertion is true. It's a macro to not throw off
    /// stack traces in test failures.
    macro_rules! assert_html {
        ($input:expr, $output:expr $(,)?) => {{
            let parse_tree = VerseParser::parse(Rule::document, $input).map_err(Box::new)?;
            eprintln!("{:#?}", parse_tree);
            assert_eq!(rendered(parse_tree), $output);
            Ok(())
        }};
    }

    mod format {
        use super::*;

        #[test]
        fn text_basic() -> TestResult {
            assert_html!("In loving memory", "<p>In loving memory</p>")
        }

        #[test]
        fn strong_basic() -> TestResult {
            assert_html!("**never forgotten**", "<p><strong>never forgotten</strong></p>")
        }

        #[test]
        fn em_basic() -> TestResult {
            assert_html!("//softly//", "<p><em>softly</em></p>")
        }

        #[test]
        fn nested() -> TestResult {
            assert_html!(
                "**so //deeply// missed**",
                "<p><strong>so <em>deeply</em> missed</strong></p>",
            )
        }

        #[test]
        fn nested_other_way() -> TestResult {
            assert_html!(
                "//a **quiet** voice//",
                "<p><em>a <strong>quiet</strong> voice</em></p>",
            )
        }

        #[test]
        fn unmatched_marker_is_literal() -> TestResult {
            assert_html!("three ** stars", "<p>three ** stars</p>")
        }

        #[test]
        fn trailing_marker_is_literal() -> TestResult {
            assert_html!("with love//", "<p>with love//</p>")
        }

        #[test]
        fn escape_all() -> TestResult {
            assert_html!("<>\"'", "<p>&lt;&gt;&quot;&#x27;</p>")
        }

        #[test]
        fn escaped_tag() -> TestResult {
            assert_html!(
                r#"<script>alert("x")</script>"#,
                "<p>&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;</p>",
            )
        }

        #[test]
        fn escaped_inside_formatting() -> TestResult {
            assert_html!(
                "**a < b**",
                "<p><strong>a &lt; b</strong></p>",
            )
        }
    }

    mod stanza {
        use super::*;

        #[test]
        fn line_breaks_preserved() -> TestResult {
            assert_html!(
                r#"Do not stand at my grave and weep
I am not there. I do not sleep."#,
                "<p>Do not stand at my grave and weep<br />I am not there. I do not sleep.</p>",
            )
        }

        #[test]
        fn stanzas_split_on_blank() -> TestResult {
            assert_html!(
                r#"first stanza

second stanza"#,
                "<p>first stanza</p><p>second stanza</p>",
            )
        }

        #[test]
        fn padded() -> TestResult {
            assert_html!(
                r#"

a quiet line


"#,
                "<p>a quiet line</p>",
            )
        }

        #[test]
        fn leading_indentation_stripped() -> TestResult {
            assert_html!("   centered line", "<p>centered line</p>")
        }

        #[test]
        fn two_stanzas_of_two_lines() -> TestResult {
            assert_html!(
                "a\nb\n\nc\nd",
                "<p>a<br />b</p><p>c<br />d</p>",
            )
        }
    }

    mod quote {
        use super::*;

        #[test]
        fn basic() -> TestResult {
            assert_html!(
                "> so we beat on",
                "<blockquote>so we beat on</blockquote>",
            )
        }

        #[test]
        fn multi_line() -> TestResult {
            assert_html!(
                r#"> And miles to go
> before I sleep"#,
                "<blockquote>And miles to go<br />before I sleep</blockquote>",
            )
        }

        #[test]
        fn formatted() -> TestResult {
            assert_html!(
                "> her //last// collection",
                "<blockquote>her <em>last</em> collection</blockquote>",
            )
        }

        #[test]
        fn empty_quote_line() -> TestResult {
            assert_html!(">", "<blockquote></blockquote>")
        }

        #[test]
        fn quote_then_stanza() -> TestResult {
            assert_html!(
                r#"> quoted words
my own words"#,
                "<blockquote>quoted words</blockquote><p>my own words</p>",
            )
        }

        #[test]
        fn stanza_then_quote() -> TestResult {
            assert_html!(
                r#"She wrote:
> the sea keeps nothing"#,
                "<p>She wrote:</p><blockquote>the sea keeps nothing</blockquote>",
            )
        }
    }

    mod document {
        use super::*;

        #[test]
        fn empty_input() -> TestResult {
            assert_html!("", "")
        }

        #[test]
        fn whitespace_only() -> TestResult {
            assert_html!("  \n \n", "")
        }

        #[test]
        fn full_tribute() -> TestResult {
            assert_html!(
                r#"She asked for nothing and gave us everything.

> And miles to go
> before I sleep

**Rest well.**"#,
                "<p>She asked for nothing and gave us everything.</p>\
                 <blockquote>And miles to go<br />before I sleep</blockquote>\
                 <p><strong>Rest well.</strong></p>",
            )
        }
    }
}
