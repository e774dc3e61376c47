//! Statement parser.
//!
//! Line-oriented: a statement ends at end-of-line (outside balanced
//! parentheses) or at `;`. Arguments separate on commas and whitespace.
//! Keywords are case-insensitive. Comments (`#` to end of line) are
//! stripped here, not in the preprocessor, so `#` keeps its meaning inside
//! quoted strings.
//!
//! The parser keeps a one-word lookahead slot shared with expression
//! parsing: an identifier read past the end of an expression (a block
//! keyword such as `then`, or the next argument) is stashed there and
//! consumed by whoever needs it next.

use std::sync::Arc;

use core_value::error::{MapyrusError, Result};
use tracing::trace;

use crate::expression::{is_identifier_part, is_identifier_start};
use crate::preprocessor::Preprocessor;
use crate::statement::{Block, CommandKind, Statement, StatementKind};

const BLOCK_KEYWORDS: [&str; 7] = ["then", "else", "elif", "endif", "do", "done", "end"];

fn is_block_keyword(word: &str) -> bool {
    BLOCK_KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

pub struct Parser {
    pre: Preprocessor,
    pub(crate) lookahead: Option<String>,
    /// Set when an identifier ended with a trailing '.', which re-reads as
    /// the concatenation operator.
    pub(crate) pending_concat: bool,
    in_procedure: bool,
}

impl Parser {
    pub fn new(pre: Preprocessor) -> Self {
        Self {
            pre,
            lookahead: None,
            pending_concat: false,
            in_procedure: false,
        }
    }

    /// Parse every statement until end of input.
    pub fn parse_all(&mut self) -> Result<Vec<Statement>> {
        let (statements, _) = self.parse_statement_list(&[])?;
        trace!(target: "lang.parse", count = statements.len(), "parsed");
        Ok(statements)
    }

    /// Close the underlying sources (cleanup on every exit path).
    pub fn close(&mut self) {
        self.pre.close();
    }

    pub(crate) fn read_char(&mut self) -> Result<Option<char>> {
        self.pre.read()
    }

    pub(crate) fn unread_char(&mut self, c: char) {
        self.pre.unread(c);
    }

    pub(crate) fn location(&self) -> (Arc<str>, u32) {
        self.pre.location()
    }

    /// Skip spaces, tabs and comments; newlines too when `multiline`.
    pub(crate) fn skip_space(&mut self, multiline: bool) -> Result<()> {
        loop {
            match self.read_char()? {
                None => return Ok(()),
                Some(' ' | '\t' | '\r') => {}
                Some('\n') if multiline => {}
                Some('#') => {
                    // Comment runs to end of line; the newline stays.
                    loop {
                        match self.read_char()? {
                            None => return Ok(()),
                            Some('\n') => {
                                self.unread_char('\n');
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                Some(c) => {
                    self.unread_char(c);
                    return Ok(());
                }
            }
        }
    }

    /// Read an identifier at the current position, or `None`. A trailing
    /// '.' is stripped and re-exposed as a pending concatenation operator.
    pub(crate) fn read_word_raw(&mut self) -> Result<Option<String>> {
        let first = match self.read_char()? {
            Some(c) if is_identifier_start(c) => c,
            Some(c) => {
                self.unread_char(c);
                return Ok(None);
            }
            None => return Ok(None),
        };
        let mut word = String::new();
        word.push(first);
        while let Some(c) = self.read_char()? {
            if is_identifier_part(c) {
                word.push(c);
            } else {
                self.unread_char(c);
                break;
            }
        }
        if word.ends_with('.') {
            word.pop();
            self.pending_concat = true;
        }
        Ok(Some(word))
    }

    /// Next word at statement position, skipping statement separators.
    fn next_statement_word(&mut self) -> Result<Option<String>> {
        if let Some(word) = self.lookahead.take() {
            return Ok(Some(word));
        }
        loop {
            self.skip_space(false)?;
            match self.read_char()? {
                None => return Ok(None),
                Some('\n' | ';') => {}
                Some(c) if is_identifier_start(c) => {
                    self.unread_char(c);
                    return self.read_word_raw();
                }
                Some(c) => {
                    return Err(MapyrusError::InvalidKeyword(c.to_string()));
                }
            }
        }
    }

    /// Parse statements until one of `terminators` (or end of input when
    /// the terminator list is empty).
    fn parse_statement_list(
        &mut self,
        terminators: &[&str],
    ) -> Result<(Vec<Statement>, Option<String>)> {
        let mut statements = Vec::new();
        loop {
            let Some(word) = self.next_statement_word()? else {
                if terminators.is_empty() {
                    return Ok((statements, None));
                }
                return Err(MapyrusError::UnexpectedEof);
            };
            if terminators.iter().any(|t| word.eq_ignore_ascii_case(t)) {
                return Ok((statements, Some(word.to_lowercase())));
            }
            statements.push(self.parse_statement(word)?);
        }
    }

    fn parse_statement(&mut self, word: String) -> Result<Statement> {
        let (file, line) = self.location();
        let kind = self
            .parse_statement_kind(&word)
            .map_err(|e| e.at(&file, line))?;
        Ok(Statement::new(kind, file, line))
    }

    fn parse_statement_kind(&mut self, word: &str) -> Result<StatementKind> {
        let lower = word.to_lowercase();
        match lower.as_str() {
            "begin" => self.parse_block_def(),
            "if" => self.parse_if(),
            "while" => self.parse_while(),
            "repeat" => self.parse_repeat(),
            "for" => self.parse_for(),
            "return" => Ok(StatementKind::Return),
            "let" => self.parse_let(),
            "local" => self.parse_local(),
            "call" => {
                let name = self.require_word("procedure name")?;
                let args = self.parse_argument_list()?;
                Ok(StatementKind::Call {
                    name: name.to_lowercase(),
                    args,
                })
            }
            _ if is_block_keyword(&lower) || lower == "in" => {
                Err(MapyrusError::InvalidKeyword(word.to_string()))
            }
            _ => {
                let args = self.parse_argument_list()?;
                match CommandKind::from_name(&lower) {
                    Some(kind) => Ok(StatementKind::Command(kind, args)),
                    None => Ok(StatementKind::Call { name: lower, args }),
                }
            }
        }
    }

    fn parse_if(&mut self) -> Result<StatementKind> {
        let cond = self.parse_expression(0)?;
        self.expect_word("then")?;
        let (then_block, term) = self.parse_statement_list(&["elif", "else", "endif"])?;
        let else_block = match term.as_deref() {
            Some("elif") => {
                let (file, line) = self.location();
                let nested = self.parse_if()?;
                vec![Statement::new(nested, file, line)]
            }
            Some("else") => {
                let (block, _) = self.parse_statement_list(&["endif"])?;
                block
            }
            _ => Vec::new(),
        };
        Ok(StatementKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<StatementKind> {
        let cond = self.parse_expression(0)?;
        self.expect_word("do")?;
        let (body, _) = self.parse_statement_list(&["done"])?;
        Ok(StatementKind::While { cond, body })
    }

    fn parse_repeat(&mut self) -> Result<StatementKind> {
        let count = self.parse_expression(0)?;
        self.expect_word("do")?;
        let (body, _) = self.parse_statement_list(&["done"])?;
        Ok(StatementKind::Repeat { count, body })
    }

    fn parse_for(&mut self) -> Result<StatementKind> {
        let var = self.require_word("loop variable")?;
        self.expect_word("in")?;
        let map = self.parse_expression(0)?;
        self.expect_word("do")?;
        let (body, _) = self.parse_statement_list(&["done"])?;
        Ok(StatementKind::For { var, map, body })
    }

    fn parse_block_def(&mut self) -> Result<StatementKind> {
        if self.in_procedure {
            return Err(MapyrusError::NestedProc);
        }
        let name = self.require_word("procedure name")?.to_lowercase();
        let params = self.parse_parameter_list()?;
        self.in_procedure = true;
        let body = self.parse_statement_list(&["end"]);
        self.in_procedure = false;
        let (body, _) = body?;
        trace!(target: "lang.parse", block = name.as_str(), params = params.len(), "block_defined");
        Ok(StatementKind::BlockDef(Arc::new(Block {
            name,
            params,
            body,
        })))
    }

    /// Parameter names after `begin NAME`, in parentheses or bare, to end
    /// of line.
    fn parse_parameter_list(&mut self) -> Result<Vec<String>> {
        let mut params = Vec::new();
        self.skip_space(false)?;
        match self.read_char()? {
            Some('(') => loop {
                self.skip_space(true)?;
                match self.read_char()? {
                    Some(')') => break,
                    Some(',') => {}
                    Some(c) if is_identifier_start(c) => {
                        self.unread_char(c);
                        if let Some(word) = self.read_word_raw()? {
                            params.push(word);
                        }
                    }
                    Some(c) => {
                        return Err(MapyrusError::InvalidKeyword(c.to_string()));
                    }
                    None => return Err(MapyrusError::UnexpectedEof),
                }
            },
            Some('\n' | ';') | None => {}
            Some(c) => {
                self.unread_char(c);
                loop {
                    self.skip_space(false)?;
                    match self.read_char()? {
                        Some('\n' | ';') | None => break,
                        Some(',') => {}
                        Some(c) if is_identifier_start(c) => {
                            self.unread_char(c);
                            if let Some(word) = self.read_word_raw()? {
                                params.push(word);
                            }
                        }
                        Some(c) => {
                            return Err(MapyrusError::InvalidKeyword(c.to_string()));
                        }
                    }
                }
            }
        }
        Ok(params)
    }

    fn parse_let(&mut self) -> Result<StatementKind> {
        let name = self.require_word("variable name")?;
        self.skip_space(false)?;
        let index = match self.read_char()? {
            Some('[') => {
                let idx = self.parse_expression(1)?;
                self.skip_space(true)?;
                match self.read_char()? {
                    Some(']') => Some(idx),
                    _ => return Err(MapyrusError::UnmatchedBracket),
                }
            }
            Some(c) => {
                self.unread_char(c);
                None
            }
            None => return Err(MapyrusError::UnexpectedEof),
        };
        self.skip_space(false)?;
        match self.read_char()? {
            Some('=') => {}
            _ => return Err(MapyrusError::ExpectedToken("=".to_string())),
        }
        let value = self.parse_expression(0)?;
        Ok(StatementKind::Assign { name, index, value })
    }

    fn parse_local(&mut self) -> Result<StatementKind> {
        let mut names = vec![self.require_word("variable name")?];
        loop {
            self.skip_space(false)?;
            match self.read_char()? {
                Some(',') => {
                    names.push(self.require_word("variable name")?);
                }
                Some(c) => {
                    self.unread_char(c);
                    break;
                }
                None => break,
            }
        }
        Ok(StatementKind::LocalDecl(names))
    }

    /// Command/call arguments: expressions separated by commas or
    /// whitespace, ending at end-of-line, `;`, end of input, or a block
    /// keyword (left in the lookahead for the enclosing construct).
    fn parse_argument_list(&mut self) -> Result<Vec<Expression>> {
        let mut args = Vec::new();
        loop {
            if let Some(word) = &self.lookahead {
                if is_block_keyword(word) {
                    break;
                }
                args.push(self.parse_expression(0)?);
                continue;
            }
            self.skip_space(false)?;
            match self.read_char()? {
                None => break,
                Some('\n' | ';') => break,
                Some(',') => {}
                Some(c) if is_identifier_start(c) => {
                    self.unread_char(c);
                    match self.read_word_raw()? {
                        Some(word) if is_block_keyword(&word) => {
                            self.lookahead = Some(word);
                            break;
                        }
                        Some(word) => {
                            self.lookahead = Some(word);
                            args.push(self.parse_expression(0)?);
                        }
                        None => break,
                    }
                }
                Some(c) => {
                    self.unread_char(c);
                    args.push(self.parse_expression(0)?);
                }
            }
        }
        Ok(args)
    }

    /// The next word, whatever it is; error naming `what` when absent.
    fn require_word(&mut self, what: &str) -> Result<String> {
        if let Some(word) = self.lookahead.take() {
            return Ok(word);
        }
        self.skip_space(false)?;
        self.read_word_raw()?
            .ok_or_else(|| MapyrusError::ExpectedToken(what.to_string()))
    }

    /// Consume the given keyword or fail with `ExpectedToken`.
    fn expect_word(&mut self, expected: &str) -> Result<()> {
        let word = if let Some(w) = self.lookahead.take() {
            Some(w)
        } else {
            self.skip_space(false)?;
            // The keyword may sit on the next line (e.g. `do` after a
            // multi-line condition is not supported; `then` on the same
            // line is required).
            self.read_word_raw()?
        };
        match word {
            Some(w) if w.eq_ignore_ascii_case(expected) => Ok(()),
            Some(w) => Err(MapyrusError::ExpectedToken(format!(
                "{expected}' before '{w}"
            ))),
            None => Err(MapyrusError::ExpectedToken(expected.to_string())),
        }
    }
}

/// Convenience wrapper: parse a whole source to statements.
pub fn parse_source(pre: Preprocessor) -> Result<Vec<Statement>> {
    let mut parser = Parser::new(pre);
    let result = parser.parse_all();
    parser.close();
    result
}

use crate::expression::Expression;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Result<Vec<Statement>> {
        parse_source(Preprocessor::from_string("test.myr", src))
    }

    fn kinds(src: &str) -> Vec<String> {
        parse(src)
            .unwrap()
            .into_iter()
            .map(|s| format!("{:?}", s.kind).split(['(', ' ']).next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn commands_and_calls() {
        let stmts = parse("move 50, 50\nlabel \"Hi\"\ndot 1, 2\n").unwrap();
        assert!(matches!(
            stmts[0].kind,
            StatementKind::Command(CommandKind::Move, _)
        ));
        assert!(matches!(
            stmts[1].kind,
            StatementKind::Command(CommandKind::Label, _)
        ));
        assert!(
            matches!(&stmts[2].kind, StatementKind::Call { name, args } if name == "dot" && args.len() == 2)
        );
    }

    #[test]
    fn semicolons_separate_statements() {
        assert_eq!(kinds("let a = 1; print a; move 0,0"), vec![
            "Assign".to_string(),
            "Command".to_string(),
            "Command".to_string()
        ]);
    }

    #[test]
    fn single_line_if_else() {
        let stmts = parse("if \"foobar\" ~ \"^f\" then print 1 else print 0 endif\n").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0].kind {
            StatementKind::If {
                then_block,
                else_block,
                ..
            } => {
                assert_eq!(then_block.len(), 1);
                assert_eq!(else_block.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn elif_nests_in_else() {
        let src = "if a > 1 then\nprint 1\nelif a > 0 then\nprint 2\nelse\nprint 3\nendif\n";
        let stmts = parse(src).unwrap();
        match &stmts[0].kind {
            StatementKind::If { else_block, .. } => {
                assert_eq!(else_block.len(), 1);
                assert!(matches!(else_block[0].kind, StatementKind::If { .. }));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn while_repeat_for_structures() {
        let src = "while i < 3 do\nlet i = i + 1\ndone\nrepeat 4 do\nprint 1\ndone\nfor k in m do\nprint k\ndone\n";
        assert_eq!(kinds(src), vec![
            "While".to_string(),
            "Repeat".to_string(),
            "For".to_string()
        ]);
    }

    #[test]
    fn block_definition_with_params() {
        let stmts = parse("begin dot (size, name)\ncircle 0, 0, size\nfill\nend\n").unwrap();
        match &stmts[0].kind {
            StatementKind::BlockDef(block) => {
                assert_eq!(block.name, "dot");
                assert_eq!(block.params, vec!["size", "name"]);
                assert_eq!(block.body.len(), 2);
            }
            other => panic!("expected block def, got {other:?}"),
        }
    }

    #[test]
    fn bare_parameter_list() {
        let stmts = parse("begin road width\nstroke\nend\n").unwrap();
        match &stmts[0].kind {
            StatementKind::BlockDef(block) => assert_eq!(block.params, vec!["width"]),
            other => panic!("expected block def, got {other:?}"),
        }
    }

    #[test]
    fn nested_procedures_rejected() {
        let err = parse("begin a\nbegin b\nend\nend\n").unwrap_err();
        assert!(matches!(err.root(), MapyrusError::NestedProc), "{err:?}");
    }

    #[test]
    fn missing_done_is_fatal() {
        let err = parse("while 1 do\nprint 1\n").unwrap_err();
        assert!(matches!(err.root(), MapyrusError::UnexpectedEof), "{err:?}");
    }

    #[test]
    fn missing_then_is_fatal() {
        let err = parse("if 1\nprint 1\nendif\n").unwrap_err();
        assert!(
            matches!(err.root(), MapyrusError::ExpectedToken(t) if t.starts_with("then")),
            "{err:?}"
        );
    }

    #[test]
    fn let_with_index() {
        let stmts = parse("let m[\"k\"] = 5\n").unwrap();
        match &stmts[0].kind {
            StatementKind::Assign { name, index, .. } => {
                assert_eq!(name, "m");
                assert!(index.is_some());
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn local_names() {
        let stmts = parse("local a, b, c\n").unwrap();
        match &stmts[0].kind {
            StatementKind::LocalDecl(names) => assert_eq!(names, &["a", "b", "c"]),
            other => panic!("expected local, got {other:?}"),
        }
    }

    #[test]
    fn comments_are_stripped() {
        let stmts = parse("# leading comment\nmove 1, 2 # trailing\n").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn errors_carry_location() {
        let err = parse("move 1, 2\nwhile 1\nprint\ndone\n").unwrap_err();
        match err {
            MapyrusError::At { file, line, .. } => {
                assert_eq!(file, "test.myr");
                assert_eq!(line, 2);
            }
            other => panic!("expected located error, got {other:?}"),
        }
    }

    #[test]
    fn case_insensitive_keywords() {
        let stmts = parse("IF 1 THEN\nPRINT 1\nENDIF\n").unwrap();
        assert!(matches!(stmts[0].kind, StatementKind::If { .. }));
    }
}
