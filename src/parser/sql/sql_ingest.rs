use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sqlparser::{
    ast::Statement,
    dialect::PostgreSqlDialect,
    parser::{Parser, ParserError as SqlParserError},
    tokenizer::Token,
};
use tracing::debug;

use crate::parser::{sql::{ExtractedSql, ShortExtractor}, ParserError, Result};

static ERROR_LOCATION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"Line: (\d+), Column:? (\d+)").ok());

/// Lowers PostgreSQL-flavoured SQL text into QL JSON.
///
/// Short expressions embedded in the text are carried over as
/// `{ "type": "short" }` values and expanded later by the tree builder.
pub struct SqlIngest {
    pub(super) extracted: ExtractedSql,
}

impl SqlIngest {
    pub fn to_ql(sql: &str) -> Result<Value> {
        let extracted = ShortExtractor::extract(sql)?;
        debug!("ingesting sql with {} embedded short expressions", extracted.shorts.len());

        let ingest = SqlIngest { extracted };
        match Self::is_query(&ingest.extracted.text) {
            true => ingest.ingest_query(),
            false => ingest.ingest_expression(),
        }
    }

    /// A leading `SELECT`/`WITH`, possibly behind opening parens.
    fn is_query(text: &str) -> bool {
        let head = text.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        let word: String = head.chars().take_while(char::is_ascii_alphabetic).collect();
        word.eq_ignore_ascii_case("select") || word.eq_ignore_ascii_case("with")
    }

    fn ingest_query(&self) -> Result<Value> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, &self.extracted.text)
            .map_err(|e| self.sql_error(e))?;

        match statements.as_slice() {
            [Statement::Query(query)] => self.query_to_ql(query),
            [] => ParserError::InvalidSql { message: "empty statement".into(), offset: Some(0) }.err(),
            [_] => Err(self.unsupported("only SELECT statements are supported", "")),
            _ => Err(self.unsupported("multiple statements are not supported", ";")),
        }
    }

    fn ingest_expression(&self) -> Result<Value> {
        let dialect = PostgreSqlDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(&self.extracted.text)
            .map_err(|e| self.sql_error(e))?;

        let expr = parser.parse_expr().map_err(|e| self.sql_error(e))?;

        let next = parser.peek_token();
        if next.token != Token::EOF {
            let offset = self.char_offset(next.location.line as usize, next.location.column as usize);
            return ParserError::InvalidSql {
                message: format!("unexpected '{}' after expression", next.token),
                offset: Some(self.extracted.original_offset(offset)),
            }.err();
        }

        self.expr_to_ql(&expr)
    }

    fn sql_error(&self, error: SqlParserError) -> ParserError {
        let message = error.to_string();
        let offset = ERROR_LOCATION.as_ref()
            .and_then(|re| re.captures(&message))
            .and_then(|caps| Some((caps[1].parse::<usize>().ok()?, caps[2].parse::<usize>().ok()?)))
            .map(|(line, column)| self.extracted.original_offset(self.char_offset(line, column)));

        ParserError::InvalidSql { message, offset }
    }

    /// 1-based line/column into a char offset of the rewritten text.
    fn char_offset(&self, line: usize, column: usize) -> usize {
        let mut offset = 0;
        for (i, text) in self.extracted.text.split('\n').enumerate() {
            if i + 1 == line {
                return offset + column.saturating_sub(1);
            }
            offset += text.chars().count() + 1;
        }
        offset
    }

    /// `SyntaxNotSupported` pointing at the first case-insensitive occurrence
    /// of `fragment` in the source, when there is one.
    pub(super) fn unsupported(&self, message: impl Into<String>, fragment: &str) -> ParserError {
        let text = self.extracted.text.to_ascii_lowercase();
        let offset = match fragment.is_empty() {
            true => None,
            false => text.find(&fragment.to_ascii_lowercase())
                .map(|byte| text[..byte].chars().count())
                .map(|offset| self.extracted.original_offset(offset)),
        };
        ParserError::not_supported(message, offset)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{sql::SqlIngest, ParserError};

    #[test]
    pub fn test_simple_select() {
        let ql = SqlIngest::to_ql("SELECT a, v.b AS c FROM v WHERE a > 1 ORDER BY a DESC LIMIT 10 OFFSET 5")
            .expect("Failed to ingest sql");

        assert_eq!(ql, json!({
            "type": "select",
            "from": "v",
            "columns": [
                { "type": "column", "column": "a" },
                { "type": "column", "column": "b", "view": "v", "as": "c" }
            ],
            "where": { "type": "operator", "value": ">", "operands": [{ "type": "column", "column": "a" }, 1] },
            "orderBy": [{ "type": "sort", "value": { "type": "column", "column": "a" }, "direction": "desc" }],
            "limit": 10,
            "offset": 5
        }));
    }

    #[test]
    pub fn test_embedded_shorts() {
        let ql = SqlIngest::to_ql("SELECT @column(a, v) AS x FROM @view(v)").expect("Failed to ingest sql");

        assert_eq!(ql, json!({
            "type": "select",
            "from": { "type": "short", "value": "@view(v)" },
            "columns": [{ "type": "short", "value": "@column(a,v)", "as": "x" }]
        }));
    }

    #[test]
    pub fn test_scalar_expression() {
        let ql = SqlIngest::to_ql("a BETWEEN 1 AND 10 AND b IS NOT NULL").expect("Failed to ingest sql");

        assert_eq!(ql, json!({
            "type": "and",
            "operands": [
                { "type": "operator", "value": "between", "operands": [{ "type": "column", "column": "a" }, 1, 10] },
                { "type": "operator", "value": "is not", "operands": [{ "type": "column", "column": "b" }, null] }
            ]
        }));
    }

    #[test]
    pub fn test_aggregates() {
        let ql = SqlIngest::to_ql("SELECT count(*), count(DISTINCT a) FROM v GROUP BY b HAVING sum(c) > 2")
            .expect("Failed to ingest sql");

        assert_eq!(ql["columns"], json!([
            { "type": "function", "value": "count", "args": [] },
            { "type": "function", "value": "count", "args": [{ "type": "column", "column": "a" }], "distinct": true }
        ]));
        assert_eq!(ql["groupBy"], json!([{ "type": "column", "column": "b" }]));
        assert_eq!(ql["having"]["value"], json!(">"));
    }

    #[test]
    pub fn test_set_operation_and_cte() {
        let ql = SqlIngest::to_ql("SELECT a FROM v UNION ALL SELECT a FROM w").expect("Failed to ingest sql");
        assert_eq!(ql["all"], json!(true));
        assert_eq!(ql["union"].as_array().map(Vec::len), Some(2));

        let ql = SqlIngest::to_ql("WITH c AS (SELECT a FROM v) SELECT a FROM c").expect("Failed to ingest sql");
        assert_eq!(ql["with"][0]["as"], json!("c"));
        assert_eq!(ql["from"], json!("c"));
    }

    #[test]
    pub fn test_joins() {
        let ql = SqlIngest::to_ql(
            "SELECT a.x FROM a LEFT JOIN b ON a.id = b.id CROSS JOIN LATERAL (SELECT 1 AS y) s, c"
        ).expect("Failed to ingest sql");

        let joins = ql["joins"].as_array().expect("Failed to read joins");
        assert_eq!(joins.len(), 3);
        assert_eq!(joins[0]["joinType"], json!("left"));
        assert_eq!(joins[1]["joinType"], json!("lateral"));
        assert_eq!(joins[1]["view"]["as"], json!("s"));
        assert_eq!(joins[2], json!({ "type": "join", "joinType": "cross", "view": "c" }));
    }

    #[test]
    pub fn test_unsupported_syntax_offsets() {
        match SqlIngest::to_ql("SELECT DISTINCT ON (a) a FROM v") {
            Err(ParserError::SyntaxNotSupported { offset, .. }) => assert_eq!(offset, Some(7)),
            _ => panic!(),
        }
        match SqlIngest::to_ql("SELECT a FROM v FULL JOIN w ON true") {
            Err(ParserError::SyntaxNotSupported { offset, .. }) => assert_eq!(offset, Some(16)),
            _ => panic!(),
        }
        match SqlIngest::to_ql("SELECT @column(abc) FROM v JOIN w USING (a)") {
            Err(ParserError::SyntaxNotSupported { offset, .. }) => assert_eq!(offset, Some(34)),
            _ => panic!(),
        }
        assert!(matches!(SqlIngest::to_ql("WITH RECURSIVE c AS (SELECT 1) SELECT * FROM c"), Err(ParserError::SyntaxNotSupported { .. })));
        assert!(matches!(SqlIngest::to_ql("SELECT sum(a) OVER () FROM v"), Err(ParserError::SyntaxNotSupported { .. })));
        assert!(matches!(SqlIngest::to_ql("SELECT a FROM v WHERE a = $1"), Err(ParserError::SyntaxNotSupported { .. })));
    }

    #[test]
    pub fn test_invalid_sql() {
        assert!(matches!(SqlIngest::to_ql("SELECT a FROM v WHERE )"), Err(ParserError::InvalidSql { .. })));
        assert!(matches!(SqlIngest::to_ql("a + "), Err(ParserError::InvalidSql { .. })));
        assert!(matches!(SqlIngest::to_ql("a b"), Err(ParserError::InvalidSql { offset: Some(2), .. })));
    }
}
