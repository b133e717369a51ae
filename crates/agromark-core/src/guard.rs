//! Read-only guard for generated SQL.
//!
//! Model-written SQL is executed without parameter binding, so before it
//! reaches the store it must look like a single read-only query over the
//! known ledger tables:
//!
//! 1. Comments are dropped, string-literal contents blanked and quoted
//!    identifiers (`"x"`, `` `x` ``, `[x]`) rewritten as bare words, so
//!    neither quoting style nor literal text can hide a keyword or table.
//! 2. One trailing `;` is allowed; any other `;` means a second statement.
//! 3. The statement must start with `SELECT` or `WITH`.
//! 4. Write, DDL and connection-level keywords are refused anywhere.
//! 5. Every table after `FROM` / `JOIN`, including each item of a comma
//!    list, must be a known table or a CTE declared in the same statement.
//!
//! This is a lexical check, not a parser. It errs on the side of refusing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::prompts::TABLE_MAPPING;

static LEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[\s(]*(select|with)\b").unwrap());

static WRITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|create|attach|detach|pragma|vacuum|reindex|truncate|grant|revoke)\b",
    )
    .unwrap()
});

static CTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bwith\b(?:\s+recursive\b)?|,)\s*([a-z_][a-z0-9_]*)\s*(?:\([^)]*\)\s*)?as\s*\(")
        .unwrap()
});

/// Words that end a table item instead of naming its alias.
const CLAUSE_WORDS: &[&str] = &[
    "where", "group", "order", "limit", "having", "window", "join", "inner", "left", "right",
    "full", "cross", "natural", "outer", "on", "using", "union", "intersect", "except",
    "indexed", "not",
];

/// Lexical allow-list validator for generated statements.
#[derive(Debug, Clone)]
pub struct SqlGuard {
    tables: Vec<String>,
}

impl SqlGuard {
    /// Guard that only admits the given table names (case-insensitive).
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tables: tables
                .into_iter()
                .map(|t| t.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Check `sql`; `Err` carries a short reason suitable for the user.
    pub fn check(&self, sql: &str) -> Result<(), String> {
        let masked = normalize(sql)?;
        let body = masked.trim();
        let body = body.strip_suffix(';').unwrap_or(body).trim_end();

        if body.is_empty() {
            return Err("a consulta está vazia".to_string());
        }
        if body.contains(';') {
            return Err("apenas uma instrução por consulta é permitida".to_string());
        }
        if !LEADING_RE.is_match(body) {
            return Err("apenas consultas SELECT são permitidas".to_string());
        }
        if let Some(m) = WRITE_RE.find(body) {
            return Err(format!(
                "a palavra-chave {} não é permitida",
                m.as_str().to_ascii_uppercase()
            ));
        }

        let ctes: Vec<String> = CTE_RE
            .captures_iter(body)
            .map(|c| c[1].to_ascii_lowercase())
            .collect();

        for name in referenced_tables(&tokenize(body)) {
            if !self.tables.contains(&name) && !ctes.contains(&name) {
                return Err(format!("tabela desconhecida: {}", name));
            }
        }

        Ok(())
    }
}

impl Default for SqlGuard {
    /// Admits the five ledger tables.
    fn default() -> Self {
        Self::new(TABLE_MAPPING.iter().map(|(_, table)| *table))
    }
}

/// Drop comments, blank out single-quoted literal contents and unquote
/// identifiers. Identifier characters outside `[A-Za-z0-9_]` become `_`.
fn normalize(sql: &str) -> Result<String, String> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push('\'');
                let mut closed = false;
                while let Some(n) = chars.next() {
                    if n == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            out.push_str("  ");
                            continue;
                        }
                        out.push('\'');
                        closed = true;
                        break;
                    }
                    out.push(' ');
                }
                if !closed {
                    return Err("literal de texto não terminado".to_string());
                }
            }
            '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let mut ident = String::new();
                let mut closed = false;
                while let Some(n) = chars.next() {
                    if n == close {
                        if close != ']' && chars.peek() == Some(&close) {
                            chars.next();
                            ident.push('_');
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    ident.push(if n.is_ascii_alphanumeric() || n == '_' { n } else { '_' });
                }
                if !closed {
                    return Err("identificador não terminado".to_string());
                }
                if ident.is_empty() {
                    ident.push('_');
                }
                out.push_str(&ident);
            }
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Punct(char),
}

impl Token<'_> {
    fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(word))
    }
}

/// Split normalized SQL into words (dotted names kept whole) and
/// single-character punctuation.
fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_' || c == '.';
    let mut tokens = Vec::new();
    let mut start = None;

    for (i, c) in sql.char_indices() {
        if is_word_char(c) {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            tokens.push(Token::Word(&sql[s..i]));
        }
        if !c.is_whitespace() {
            tokens.push(Token::Punct(c));
        }
    }
    if let Some(s) = start {
        tokens.push(Token::Word(&sql[s..]));
    }

    tokens
}

/// Lowercased names in table position: the first item after every
/// `FROM` / `JOIN`, each further item of a comma list, and the leading
/// item of a parenthesized join.
fn referenced_tables(tokens: &[Token<'_>]) -> Vec<String> {
    let mut names = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let is_from = token.is_word("from");
        if !is_from && !token.is_word("join") {
            continue;
        }
        // `a IS [NOT] DISTINCT FROM b` is a comparison.
        if is_from
            && i >= 2
            && tokens[i - 1].is_word("distinct")
            && (tokens[i - 2].is_word("is") || tokens[i - 2].is_word("not"))
        {
            continue;
        }
        table_list(tokens, i + 1, &mut names);
    }

    names
}

fn table_list(tokens: &[Token<'_>], mut j: usize, names: &mut Vec<String>) {
    loop {
        match tokens.get(j) {
            Some(Token::Punct('(')) => {
                let subquery = tokens
                    .get(j + 1)
                    .is_some_and(|t| t.is_word("select") || t.is_word("with") || t.is_word("values"));
                if !subquery {
                    table_list(tokens, j + 1, names);
                }
                j = skip_group(tokens, j);
            }
            Some(Token::Word(name)) => {
                names.push(name.to_ascii_lowercase());
                j += 1;
            }
            _ => return,
        }

        if tokens.get(j).is_some_and(|t| t.is_word("as")) {
            j += 2;
        } else if let Some(Token::Word(alias)) = tokens.get(j) {
            if !CLAUSE_WORDS.iter().any(|w| alias.eq_ignore_ascii_case(w)) {
                j += 1;
            }
        }

        if tokens.get(j) != Some(&Token::Punct(',')) {
            return;
        }
        j += 1;
    }
}

/// Index just past the `)` matching the `(` at `open`.
fn skip_group(tokens: &[Token<'_>], open: usize) -> usize {
    let mut depth = 0usize;
    for (k, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Punct('(') => depth += 1,
            Token::Punct(')') => {
                depth -= 1;
                if depth == 0 {
                    return k + 1;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> SqlGuard {
        SqlGuard::default()
    }

    #[test]
    fn test_accepts_simple_count() {
        assert!(guard()
            .check("SELECT COUNT(*) FROM pessoa WHERE tipo = 'FORNECEDOR';")
            .is_ok());
    }

    #[test]
    fn test_accepts_joined_aggregate() {
        let sql = r#"SELECT SUM(mc."valorTotal") FROM movimento_contas AS mc
            JOIN movimento_classificacao AS mcl ON mc.id = mcl."movimentoId"
            JOIN classificacao AS c ON mcl."classificacaoId" = c.id
            WHERE c.descricao = 'INSUMOS AGRÍCOLAS';"#;
        assert!(guard().check(sql).is_ok());
    }

    #[test]
    fn test_accepts_cte() {
        let sql = "WITH abertas AS (SELECT * FROM parcela_contas WHERE \"statusParcela\" = 'ABERTA') \
                   SELECT COUNT(*) FROM abertas;";
        assert!(guard().check(sql).is_ok());
    }

    #[test]
    fn test_rejects_writes() {
        let err = guard().check("DELETE FROM pessoa;").unwrap_err();
        assert!(err.contains("SELECT"));
        let err = guard()
            .check("WITH x AS (SELECT 1) UPDATE pessoa SET status = 'INATIVO';")
            .unwrap_err();
        assert!(err.contains("UPDATE"));
    }

    #[test]
    fn test_rejects_stacked_statements() {
        let err = guard()
            .check("SELECT * FROM pessoa; DROP TABLE pessoa;")
            .unwrap_err();
        assert!(err.contains("uma instrução"));
    }

    #[test]
    fn test_keywords_inside_literals_are_ignored() {
        assert!(guard()
            .check("SELECT * FROM movimento_contas WHERE descricao = 'DROP; delete from x';")
            .is_ok());
    }

    #[test]
    fn test_keywords_inside_comments_are_ignored() {
        assert!(guard()
            .check("SELECT * FROM pessoa -- ; drop table pessoa\n;")
            .is_ok());
        assert!(guard()
            .check("SELECT /* update */ id FROM pessoa;")
            .is_ok());
    }

    #[test]
    fn test_rejects_unknown_table() {
        let err = guard().check("SELECT * FROM sqlite_master;").unwrap_err();
        assert!(err.contains("sqlite_master"));
    }

    #[test]
    fn test_rejects_unterminated_literal() {
        assert!(guard().check("SELECT * FROM pessoa WHERE tipo = 'X;").is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(guard().check("  ; ").is_err());
    }

    #[test]
    fn test_escaped_quote_in_literal() {
        assert!(guard()
            .check("SELECT * FROM pessoa WHERE \"razaoSocial\" = 'D''Ávila; LTDA';")
            .is_ok());
    }

    #[test]
    fn test_rejects_backtick_quoted_unknown_table() {
        let err = guard().check("SELECT * FROM `sqlite_master`;").unwrap_err();
        assert_eq!(err, "tabela desconhecida: sqlite_master");
    }

    #[test]
    fn test_rejects_bracket_quoted_unknown_table() {
        let err = guard().check("SELECT * FROM [sqlite_master];").unwrap_err();
        assert_eq!(err, "tabela desconhecida: sqlite_master");
    }

    #[test]
    fn test_rejects_double_quoted_unknown_table() {
        let err = guard().check("SELECT * FROM \"sqlite_master\";").unwrap_err();
        assert_eq!(err, "tabela desconhecida: sqlite_master");
    }

    #[test]
    fn test_accepts_quoted_known_tables() {
        assert!(guard().check("SELECT COUNT(*) FROM `pessoa`;").is_ok());
        assert!(guard().check("SELECT COUNT(*) FROM [classificacao];").is_ok());
    }

    #[test]
    fn test_rejects_unknown_table_in_comma_list() {
        let err = guard()
            .check("SELECT * FROM pessoa, sqlite_master;")
            .unwrap_err();
        assert!(err.contains("sqlite_master"));
        let err = guard()
            .check("SELECT * FROM pessoa AS p, classificacao c, `sqlite_master` m;")
            .unwrap_err();
        assert!(err.contains("sqlite_master"));
    }

    #[test]
    fn test_accepts_comma_join_of_known_tables() {
        let sql = r#"SELECT p."razaoSocial", mc."valorTotal"
            FROM pessoa p, movimento_contas AS mc
            WHERE mc."fornecedorId" = p.id;"#;
        assert!(guard().check(sql).is_ok());
    }

    #[test]
    fn test_rejects_table_after_subquery_in_comma_list() {
        let err = guard()
            .check("SELECT * FROM (SELECT id FROM pessoa) AS s, sqlite_master;")
            .unwrap_err();
        assert!(err.contains("sqlite_master"));
    }

    #[test]
    fn test_rejects_parenthesized_and_qualified_tables() {
        assert!(guard().check("SELECT * FROM (sqlite_master);").is_err());
        let err = guard().check("SELECT * FROM main.sqlite_master;").unwrap_err();
        assert!(err.contains("main.sqlite_master"));
        assert!(guard()
            .check("SELECT * FROM pessoa JOIN \"main\".\"pessoa\" q ON q.id = pessoa.id;")
            .is_err());
    }

    #[test]
    fn test_apostrophe_inside_quoted_identifier() {
        assert!(guard()
            .check("SELECT p.id AS \"nome d'Ávila\" FROM pessoa p;")
            .is_ok());
    }

    #[test]
    fn test_is_distinct_from_is_not_a_table() {
        assert!(guard()
            .check("SELECT id FROM movimento_contas WHERE descricao IS DISTINCT FROM NULL;")
            .is_ok());
        assert!(guard()
            .check("SELECT id FROM movimento_contas WHERE descricao IS NOT DISTINCT FROM 'x';")
            .is_ok());
    }

    #[test]
    fn test_rejects_unterminated_identifier() {
        assert!(guard().check("SELECT * FROM `pessoa;").is_err());
    }
}
