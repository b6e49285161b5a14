use crate::parser::{short::{ShortExpression, ShortParser}, ParserError, Result};

/// One short expression cut out of the SQL text.
#[derive(Debug, Clone, PartialEq)]
struct Replacement {
    /// chars, in the rewritten text
    start: usize,
    len: usize,
    /// chars, in the source text
    original_start: usize,
    original_len: usize,
}

/// SQL text with embedded short expressions replaced by `$k` placeholders.
///
/// Shorts directly after `FROM`/`JOIN` become the quoted identifier `"$k"`
/// so they parse as relations.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSql {
    pub text: String,
    pub shorts: Vec<ShortExpression>,
    replacements: Vec<Replacement>,
}

impl ExtractedSql {
    /// Short expression behind placeholder `$k`.
    pub fn short(&self, placeholder: &str) -> Option<&ShortExpression> {
        let index: usize = placeholder.strip_prefix('$')?.parse().ok()?;
        self.shorts.get(index.checked_sub(1)?)
    }

    /// Maps a char offset in the rewritten text back into the source.
    pub fn original_offset(&self, offset: usize) -> usize {
        let mut shift: isize = 0;
        for replacement in &self.replacements {
            if offset < replacement.start {
                break;
            }
            if offset < replacement.start + replacement.len {
                return replacement.original_start;
            }
            shift += replacement.original_len as isize - replacement.len as isize;
        }
        (offset as isize + shift).max(0) as usize
    }
}

pub struct ShortExtractor;

impl ShortExtractor {
    /// Rejects user `$n` parameters and swaps shorts for placeholders.
    /// Quoted text and comments are left alone.
    pub fn extract(sql: &str) -> Result<ExtractedSql> {
        let text_v: Vec<char> = sql.chars().collect();
        let mut out: Vec<char> = Vec::with_capacity(text_v.len());
        let mut shorts = Vec::new();
        let mut replacements = Vec::new();
        let mut i = 0;

        while i < text_v.len() {
            let c = text_v[i];
            let next = text_v.get(i + 1).copied().unwrap_or('\0');

            match c {
                '\'' | '"' => {
                    let end = Self::skip_until(&text_v, i + 1, &[c]);
                    out.extend_from_slice(&text_v[i..end]);
                    i = end;
                },
                '-' if next == '-' => {
                    let end = Self::skip_until(&text_v, i + 2, &['\n']);
                    out.extend_from_slice(&text_v[i..end]);
                    i = end;
                },
                '/' if next == '*' => {
                    let end = Self::skip_until(&text_v, i + 2, &['*', '/']);
                    out.extend_from_slice(&text_v[i..end]);
                    i = end;
                },
                '$' if next == '$' => {
                    let end = Self::skip_until(&text_v, i + 2, &['$', '$']);
                    out.extend_from_slice(&text_v[i..end]);
                    i = end;
                },
                '$' if next.is_ascii_digit() => {
                    return ParserError::not_supported("positional parameters ($n) are not supported", Some(i)).err();
                },
                '@' if ShortParser::starts_short(&text_v, i) => {
                    let rest: String = text_v[i..].iter().collect();
                    let (expression, consumed) = ShortParser::parse_prefix(&rest).map_err(|e| e.with_base_offset(i))?;

                    shorts.push(expression);
                    let placeholder = match Self::follows_relation_keyword(&out) {
                        true => format!("\"${}\"", shorts.len()),
                        false => format!("${}", shorts.len()),
                    };

                    replacements.push(Replacement {
                        start: out.len(),
                        len: placeholder.chars().count(),
                        original_start: i,
                        original_len: consumed,
                    });
                    out.extend(placeholder.chars());
                    i += consumed;
                },
                _ => {
                    out.push(c);
                    i += 1;
                },
            }
        }

        Ok(ExtractedSql { text: out.into_iter().collect(), shorts, replacements })
    }

    /// Index just past `terminator` (searching from `from`), or the end.
    fn skip_until(text_v: &[char], from: usize, terminator: &[char]) -> usize {
        let mut i = from;
        while i + terminator.len() <= text_v.len() {
            if text_v[i..i + terminator.len()] == *terminator {
                return i + terminator.len();
            }
            i += 1;
        }
        text_v.len()
    }

    fn follows_relation_keyword(out: &[char]) -> bool {
        let word: String = out.iter()
            .rev()
            .skip_while(|c| c.is_whitespace())
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        word.eq_ignore_ascii_case("from") || word.eq_ignore_ascii_case("join")
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{sql::ShortExtractor, ParserError};

    #[test]
    pub fn test_extract_shorts() {
        let extracted = ShortExtractor::extract("SELECT @column(a, v) FROM @view(v) WHERE x = '@column(b)'")
            .expect("Failed to extract");

        assert_eq!(extracted.text, "SELECT $1 FROM \"$2\" WHERE x = '@column(b)'");
        assert_eq!(extracted.shorts.len(), 2);
        assert_eq!(extracted.short("$1").map(|s| s.to_string()).as_deref(), Some("@column(a,v)"));
        assert_eq!(extracted.short("$3"), None);
    }

    #[test]
    pub fn test_original_offset() {
        let extracted = ShortExtractor::extract("SELECT @column(abc) + zz").expect("Failed to extract");
        assert_eq!(extracted.text, "SELECT $1 + zz");
        assert_eq!(extracted.original_offset(3), 3);
        assert_eq!(extracted.original_offset(8), 7);
        assert_eq!(extracted.original_offset(12), 22);
    }

    #[test]
    pub fn test_positional_parameters_rejected() {
        match ShortExtractor::extract("SELECT a FROM v WHERE a = $1") {
            Err(ParserError::SyntaxNotSupported { offset, .. }) => assert_eq!(offset, Some(26)),
            _ => panic!(),
        }
        assert!(ShortExtractor::extract("SELECT '$1'").is_ok());
    }

    #[test]
    pub fn test_array_operators_are_not_shorts() {
        let extracted = ShortExtractor::extract("SELECT a @> b, c <@ d").expect("Failed to extract");
        assert!(extracted.shorts.is_empty());
    }
}
