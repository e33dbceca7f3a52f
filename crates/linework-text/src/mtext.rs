//! MTEXT inline-format parser.
//!
//! MTEXT content embeds a small formatting sub-language. The parser turns a
//! raw string into a flat item stream the layouter consumes; formatting the
//! engine does not render (font switches, color, height overrides) is
//! recognized and dropped. Malformed codes are warned about and skipped.

/// Paragraph alignment selected by `\pxq<l|c|r|d|j>;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphAlignment {
    #[default]
    Left,
    Center,
    Right,
    /// Distribute glyphs over the full column width.
    Distribute,
    /// Default justification.
    Justify,
}

/// Line-spacing style selected by `\pxs<a|e|m|*><number>;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSpacingStyle {
    AtLeast,
    Exactly,
    Multiple,
    /// `*` resets to the default spacing.
    Reset,
}

/// One parsed MTEXT item.
#[derive(Debug, Clone, PartialEq)]
pub enum MTextItem {
    /// A plain text run, with special-character sequences expanded.
    Text(String),
    /// A `{...}` scope wrapping its content.
    Scope(Vec<MTextItem>),
    /// Paragraph break (`\P` or `^J`).
    Paragraph,
    /// Non-breaking space (`\~`).
    NonBreakingSpace,
    ParagraphAlignment(ParagraphAlignment),
    ParagraphLineSpacing {
        style: LineSpacingStyle,
        factor: f64,
    },
    /// Tab (`^I`).
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Text,
    Escape,
    ParagraphProps,
    Caret,
    SkipFormat,
}

/// Parse MTEXT content into a flat item stream.
pub fn parse_mtext(input: &str) -> Vec<MTextItem> {
    let mut parser = Parser::new();
    parser.run(input);
    parser.finish()
}

/// Concatenate all text runs of an item stream, descending into scopes.
pub fn flatten_text(items: &[MTextItem]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            MTextItem::Text(text) => out.push_str(text),
            MTextItem::Scope(content) => out.push_str(&flatten_text(content)),
            _ => {}
        }
    }
    out
}

struct Parser {
    /// Scope stack; the bottom entry is the top-level stream.
    stack: Vec<Vec<MTextItem>>,
    text: String,
    props: String,
    state: State,
}

impl Parser {
    fn new() -> Self {
        Self {
            stack: vec![Vec::new()],
            text: String::new(),
            props: String::new(),
            state: State::Text,
        }
    }

    fn run(&mut self, input: &str) {
        for c in input.chars() {
            match self.state {
                State::Text => self.text_char(c),
                State::Escape => self.escape_char(c),
                State::ParagraphProps => {
                    if c == ';' {
                        let props = std::mem::take(&mut self.props);
                        self.paragraph_props(&props);
                        self.state = State::Text;
                    } else {
                        self.props.push(c);
                    }
                }
                State::Caret => {
                    match c {
                        'I' => self.push(MTextItem::Tab),
                        'J' => self.push(MTextItem::Paragraph),
                        _ => {}
                    }
                    self.state = State::Text;
                }
                State::SkipFormat => {
                    if c == ';' {
                        self.state = State::Text;
                    }
                }
            }
        }
    }

    fn text_char(&mut self, c: char) {
        match c {
            '\\' => self.state = State::Escape,
            '{' => {
                self.flush_text();
                self.stack.push(Vec::new());
            }
            '}' => {
                self.flush_text();
                if self.stack.len() > 1 {
                    let content = self.stack.pop().unwrap();
                    self.push(MTextItem::Scope(content));
                } else {
                    tracing::warn!("Unmatched '}}' in MTEXT content");
                }
            }
            '^' => self.state = State::Caret,
            _ => self.text.push(c),
        }
    }

    fn escape_char(&mut self, c: char) {
        self.state = State::Text;
        match c {
            'P' => self.push(MTextItem::Paragraph),
            '~' => self.push(MTextItem::NonBreakingSpace),
            '\\' | '{' | '}' => self.text.push(c),
            'p' => {
                self.props.clear();
                self.state = State::ParagraphProps;
            }
            // Long-form codes carry a value terminated by ';'. They end the
            // current text run even though their value is dropped.
            'f' | 'F' | 'H' | 'W' | 'S' | 'A' | 'C' | 'T' | 'Q' => {
                self.flush_text();
                self.state = State::SkipFormat;
            }
            // Short unary codes with no effect here.
            'L' | 'l' | 'O' | 'o' | 'K' | 'k' | 'J' | 'X' => {}
            // `\U+XXXX` is expanded by the shared pre-processor.
            'U' => {
                self.text.push('\\');
                self.text.push('U');
            }
            _ => {
                tracing::warn!(code = %c.escape_default(), "Unknown MTEXT escape, skipping");
            }
        }
    }

    /// Parse the body of a `\p...;` paragraph-properties code.
    fn paragraph_props(&mut self, props: &str) {
        let mut chars = props.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                'q' => {
                    let alignment = match chars.next() {
                        Some('l') => ParagraphAlignment::Left,
                        Some('c') => ParagraphAlignment::Center,
                        Some('r') => ParagraphAlignment::Right,
                        Some('d') => ParagraphAlignment::Distribute,
                        Some('j') => ParagraphAlignment::Justify,
                        other => {
                            tracing::warn!(?other, "Unknown paragraph alignment, skipping");
                            continue;
                        }
                    };
                    self.push(MTextItem::ParagraphAlignment(alignment));
                }
                's' => {
                    let style = match chars.next() {
                        Some('a') => LineSpacingStyle::AtLeast,
                        Some('e') => LineSpacingStyle::Exactly,
                        Some('m') => LineSpacingStyle::Multiple,
                        Some('*') => LineSpacingStyle::Reset,
                        other => {
                            tracing::warn!(?other, "Unknown line spacing style, skipping");
                            continue;
                        }
                    };
                    let mut number = String::new();
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii_digit() || next == '.' || next == '-' || next == '+' {
                            number.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let factor = number.parse::<f64>().unwrap_or(1.0);
                    self.push(MTextItem::ParagraphLineSpacing { style, factor });
                }
                // Prefix and separator characters inside the code.
                'x' | ',' | ' ' => {}
                _ => {}
            }
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = expand_special(&std::mem::take(&mut self.text));
            self.stack.last_mut().unwrap().push(MTextItem::Text(text));
        }
    }

    fn push(&mut self, item: MTextItem) {
        self.flush_text();
        self.stack.last_mut().unwrap().push(item);
    }

    fn finish(mut self) -> Vec<MTextItem> {
        self.flush_text();
        while self.stack.len() > 1 {
            tracing::warn!("Unclosed '{{' in MTEXT content");
            let content = self.stack.pop().unwrap();
            self.stack
                .last_mut()
                .unwrap()
                .push(MTextItem::Scope(content));
        }
        self.stack.pop().unwrap()
    }
}

/// Expand DXF special-character sequences in plain text.
///
/// `%%d` → degree, `%%p` → plus/minus, `%%c` → diameter, `%%%` → percent
/// (case-insensitive), and `\U+XXXX` → the code point. Unrecognized
/// sequences pass through unchanged.
pub fn expand_special(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' && i + 2 < chars.len() && chars[i + 1] == '%' {
            let replacement = match chars[i + 2].to_ascii_lowercase() {
                'd' => Some('\u{00B0}'),
                'p' => Some('\u{00B1}'),
                'c' => Some('\u{2300}'),
                '%' => Some('%'),
                _ => None,
            };
            if let Some(replacement) = replacement {
                out.push(replacement);
                i += 3;
                continue;
            }
        }
        if chars[i] == '\\'
            && i + 5 < chars.len()
            && chars[i + 1] == 'U'
            && chars[i + 2] == '+'
        {
            let hex: String = chars[i + 3..i + 7].iter().collect();
            if let Ok(code) = u32::from_str_radix(&hex, 16) {
                if let Some(c) = char::from_u32(code) {
                    out.push(c);
                    i += 7;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse_mtext("Hello"),
            vec![MTextItem::Text("Hello".to_string())]
        );
    }

    #[test]
    fn test_paragraph_break() {
        assert_eq!(
            parse_mtext("Hello\\PWorld"),
            vec![
                MTextItem::Text("Hello".to_string()),
                MTextItem::Paragraph,
                MTextItem::Text("World".to_string()),
            ]
        );
    }

    #[test]
    fn test_scope() {
        assert_eq!(
            parse_mtext("a{bc}d"),
            vec![
                MTextItem::Text("a".to_string()),
                MTextItem::Scope(vec![MTextItem::Text("bc".to_string())]),
                MTextItem::Text("d".to_string()),
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_mtext("a\\{b\\}c\\\\d"),
            vec![MTextItem::Text("a{b}c\\d".to_string())]
        );
    }

    #[test]
    fn test_non_breaking_space_and_tab() {
        assert_eq!(
            parse_mtext("a\\~b^Ic"),
            vec![
                MTextItem::Text("a".to_string()),
                MTextItem::NonBreakingSpace,
                MTextItem::Text("b".to_string()),
                MTextItem::Tab,
                MTextItem::Text("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_caret_paragraph() {
        assert_eq!(
            parse_mtext("a^Jb"),
            vec![
                MTextItem::Text("a".to_string()),
                MTextItem::Paragraph,
                MTextItem::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_long_form_codes_skipped() {
        assert_eq!(
            parse_mtext("\\fArial|b0|i0;Hi\\H2.5x;there"),
            vec![
                MTextItem::Text("Hi".to_string()),
                MTextItem::Text("there".to_string()),
            ]
        );
    }

    #[test]
    fn test_short_codes_skipped() {
        assert_eq!(
            parse_mtext("\\LHello\\l"),
            vec![MTextItem::Text("Hello".to_string())]
        );
    }

    #[test]
    fn test_paragraph_alignment() {
        assert_eq!(
            parse_mtext("\\pxqc;Mid"),
            vec![
                MTextItem::ParagraphAlignment(ParagraphAlignment::Center),
                MTextItem::Text("Mid".to_string()),
            ]
        );
    }

    #[test]
    fn test_paragraph_line_spacing() {
        assert_eq!(
            parse_mtext("\\pxsm1.5;x"),
            vec![
                MTextItem::ParagraphLineSpacing {
                    style: LineSpacingStyle::Multiple,
                    factor: 1.5,
                },
                MTextItem::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_spacing_reset() {
        assert_eq!(
            parse_mtext("\\pxs*1;x"),
            vec![
                MTextItem::ParagraphLineSpacing {
                    style: LineSpacingStyle::Reset,
                    factor: 1.0,
                },
                MTextItem::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_flatten_round_trip() {
        let input = "ab{cd\\Pef}gh\\~ij";
        let items = parse_mtext(input);
        assert_eq!(flatten_text(&items), "abcdefghij");
    }

    #[test]
    fn test_unmatched_close_brace_ignored() {
        assert_eq!(
            parse_mtext("ab}cd"),
            vec![
                MTextItem::Text("ab".to_string()),
                MTextItem::Text("cd".to_string()),
            ]
        );
    }

    #[test]
    fn test_unclosed_scope_wrapped() {
        assert_eq!(
            parse_mtext("ab{cd"),
            vec![
                MTextItem::Text("ab".to_string()),
                MTextItem::Scope(vec![MTextItem::Text("cd".to_string())]),
            ]
        );
    }

    #[test]
    fn test_expand_special() {
        assert_eq!(expand_special("45%%d"), "45\u{00B0}");
        assert_eq!(expand_special("%%p0.5"), "\u{00B1}0.5");
        assert_eq!(expand_special("%%C10"), "\u{2300}10");
        assert_eq!(expand_special("50%%%"), "50%");
        assert_eq!(expand_special("%%x"), "%%x");
    }

    #[test]
    fn test_expand_unicode_escape() {
        assert_eq!(expand_special("\\U+0041bc"), "Abc");
        assert_eq!(expand_special("\\U+00"), "\\U+00");
    }

    #[test]
    fn test_unicode_escape_through_parser() {
        assert_eq!(
            parse_mtext("x\\U+0041y"),
            vec![MTextItem::Text("xAy".to_string())]
        );
    }
}
