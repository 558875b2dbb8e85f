//! Parser driver
//!
//! A recursive-descent walk of the UniScript grammar whose only output is
//! the `(action_id, token)` stream delivered to the semantic analyzer. The
//! walk owns concrete syntax; every meaning lives behind the action IDs.
//! Operator actions are emitted in token order; the analyzer's expression
//! typer folds as it goes, so no precedence tree is built here.
//!
//! A grammar rejection surfaces as a syntactic fault carrying the
//! unexpected token's position and length.

use crate::analyzer::Analyzer;
use crate::diagnostics::CompileError;
use crate::lexer::tokenize;
use crate::token::Token;

const KEYWORDS: [&str; 25] = [
    "print", "read", "var", "const", "function", "int", "float", "string", "bool", "void",
    "if", "else", "elif", "do", "while", "for", "return", "switch", "case", "break",
    "default", "throw", "true", "false", "null",
];

/// Tokenize `source` and replay its action stream into `analyzer`.
///
/// The analyzer must already hold the same source text (for position
/// probing). On success the end-of-program action (99) has been delivered.
pub fn run(source: &str, analyzer: &mut Analyzer) -> Result<(), CompileError> {
    let tokens = tokenize(source)?;
    let mut driver = Driver {
        tokens,
        pos: 0,
        source_len: source.len(),
        analyzer,
    };
    driver.parse_program()
}

struct Driver<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source_len: usize,
    analyzer: &'a mut Analyzer,
}

impl Driver<'_> {
    fn parse_program(&mut self) -> Result<(), CompileError> {
        while !self.at_end() {
            if self.check("function") {
                self.parse_function()?;
            } else {
                self.parse_statement()?;
            }
        }
        self.emit(99, None)
    }

    // ---- token plumbing -------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_lexeme(&self) -> Option<&str> {
        self.peek().map(|t| t.lexeme.as_str())
    }

    fn check(&self, lexeme: &str) -> bool {
        self.peek_lexeme() == Some(lexeme)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn match_lexeme(&mut self, lexeme: &str) -> bool {
        if self.check(lexeme) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn syntactic(&self, message: String) -> CompileError {
        let (position, length) = match self.peek() {
            Some(token) => (token.diag_position(), token.diag_length()),
            None => (self.source_len as i32, 1),
        };
        CompileError::Syntactic {
            message,
            position,
            length,
        }
    }

    fn expect(&mut self, lexeme: &str) -> Result<Token, CompileError> {
        if self.check(lexeme) {
            let token = self.tokens[self.pos].clone();
            self.pos += 1;
            return Ok(token);
        }
        Err(self.syntactic(match self.peek_lexeme() {
            Some(found) => format!("Era esperado '{}', encontrado '{}'", lexeme, found),
            None => format!("Era esperado '{}', encontrado fim de arquivo", lexeme),
        }))
    }

    fn expect_identifier(&mut self) -> Result<Token, CompileError> {
        match self.peek() {
            Some(token) if is_identifier(&token.lexeme) && !KEYWORDS.contains(&token.lexeme.as_str()) => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(self.syntactic(format!(
                "Era esperado um identificador, encontrado '{}'",
                token.lexeme
            ))),
            None => Err(self.syntactic(
                "Era esperado um identificador, encontrado fim de arquivo".to_string(),
            )),
        }
    }

    /// Type positions accept any identifier-shaped lexeme; a non-type word
    /// surfaces as the analyzer's unknown-type fault.
    fn expect_type_token(&mut self) -> Result<Token, CompileError> {
        match self.peek() {
            Some(token) if is_identifier(&token.lexeme) => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(self.syntactic(format!(
                "Era esperado um tipo, encontrado '{}'",
                token.lexeme
            ))),
            None => Err(self.syntactic(
                "Era esperado um tipo, encontrado fim de arquivo".to_string(),
            )),
        }
    }

    fn emit(&mut self, action: i32, token: Option<&Token>) -> Result<(), CompileError> {
        self.analyzer.execute_action(action, token)
    }

    // ---- statements -----------------------------------------------------

    fn parse_statement(&mut self) -> Result<(), CompileError> {
        match self.peek_lexeme() {
            Some("var") | Some("const") => self.parse_declaration(),
            Some("if") => self.parse_if_chain(),
            Some("while") => self.parse_while(),
            Some("do") => self.parse_do_while(),
            Some("for") => self.parse_for(),
            Some("switch") => self.parse_switch(),
            Some("return") => self.parse_return(),
            Some("break") => {
                let kw = self.advance();
                self.emit(32, kw.as_ref())?;
                self.expect(";")?;
                Ok(())
            }
            Some("throw") => {
                let kw = self.advance();
                self.emit(33, kw.as_ref())?;
                if !self.check(";") {
                    self.parse_expression()?;
                }
                let semi = self.expect(";")?;
                self.emit(42, Some(&semi))
            }
            Some("print") => self.parse_print(),
            Some("read") => self.parse_read(),
            Some("{") => {
                self.expect("{")?;
                self.emit(34, None)?;
                self.parse_block_statements()?;
                self.expect("}")?;
                self.emit(44, None)
            }
            Some(";") => {
                let semi = self.advance();
                self.emit(42, semi.as_ref())
            }
            Some("++") | Some("--") => {
                let op = self.advance();
                let name = self.expect_identifier()?;
                self.emit(24, Some(&name))?;
                self.emit(27, op.as_ref())?;
                let semi = self.expect(";")?;
                self.emit(42, Some(&semi))
            }
            Some(lexeme) if is_identifier(lexeme) && !KEYWORDS.contains(&lexeme) => {
                self.parse_simple_statement()
            }
            Some(lexeme) => Err(self.syntactic(format!("Token inesperado: '{}'", lexeme))),
            None => Err(self.syntactic("Fim de arquivo inesperado".to_string())),
        }
    }

    fn parse_block_statements(&mut self) -> Result<(), CompileError> {
        while !self.at_end() && !self.check("}") {
            if self.check("function") {
                self.parse_function()?;
            } else {
                self.parse_statement()?;
            }
        }
        Ok(())
    }

    fn parse_declaration(&mut self) -> Result<(), CompileError> {
        let kw = self.advance();
        self.emit(25, kw.as_ref())?;
        let name = self.expect_identifier()?;
        self.emit(22, Some(&name))?;
        self.expect(":")?;
        let ty = self.expect_type_token()?;
        self.emit(19, Some(&ty))?;
        if self.match_lexeme("[") {
            self.expect("]")?;
        }
        if self.match_lexeme("=") {
            self.parse_expression()?;
        }
        let semi = self.expect(";")?;
        self.emit(42, Some(&semi))
    }

    fn parse_simple_statement(&mut self) -> Result<(), CompileError> {
        let name = match self.advance() {
            Some(token) => token,
            None => return Err(self.syntactic("Fim de arquivo inesperado".to_string())),
        };
        match self.peek_lexeme() {
            Some("=") => {
                self.emit(22, Some(&name))?;
                self.expect("=")?;
                self.parse_expression()?;
                let semi = self.expect(";")?;
                self.emit(42, Some(&semi))
            }
            Some("[") => {
                self.emit(15, Some(&name))?;
                self.expect("[")?;
                self.parse_expression()?;
                self.expect("]")?;
                self.expect("=")?;
                self.parse_expression()?;
                let semi = self.expect(";")?;
                self.emit(42, Some(&semi))
            }
            Some("(") => {
                self.emit(14, Some(&name))?;
                let lp = self.expect("(")?;
                self.emit(12, Some(&lp))?;
                if !self.check(")") {
                    loop {
                        self.parse_expression()?;
                        if !self.match_lexeme(",") {
                            break;
                        }
                    }
                }
                let rp = self.expect(")")?;
                self.emit(13, Some(&rp))?;
                let semi = self.expect(";")?;
                self.emit(42, Some(&semi))
            }
            Some("++") | Some("--") => {
                self.emit(24, Some(&name))?;
                let op = self.advance();
                self.emit(27, op.as_ref())?;
                let semi = self.expect(";")?;
                self.emit(42, Some(&semi))
            }
            Some(found) => Err(self.syntactic(format!(
                "Instrução inválida após '{}': '{}'",
                name.lexeme, found
            ))),
            None => Err(self.syntactic("Fim de arquivo inesperado".to_string())),
        }
    }

    fn parse_print(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("print")?;
        let lp = self.expect("(")?;
        self.emit(12, Some(&lp))?;
        if !self.check(")") {
            loop {
                self.parse_expression()?;
                if !self.match_lexeme(",") {
                    break;
                }
            }
        }
        let rp = self.expect(")")?;
        self.emit(13, Some(&rp))?;
        self.emit(17, Some(&kw))?;
        let semi = self.expect(";")?;
        self.emit(42, Some(&semi))
    }

    fn parse_read(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("read")?;
        self.expect("(")?;
        let target = self.expect_identifier()?;
        if self.check("[") {
            self.emit(15, Some(&target))?;
            self.expect("[")?;
            self.parse_expression()?;
            self.expect("]")?;
        } else {
            self.emit(22, Some(&target))?;
        }
        self.expect(")")?;
        self.emit(18, Some(&kw))?;
        let semi = self.expect(";")?;
        self.emit(42, Some(&semi))
    }

    fn parse_return(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("return")?;
        if !self.check(";") {
            self.parse_expression()?;
        }
        self.expect(";")?;
        self.emit(31, Some(&kw))
    }

    fn parse_if_chain(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("if")?;
        self.parse_conditional_branch(&kw)?;
        loop {
            if self.check("elif") {
                let kw = self.expect("elif")?;
                self.parse_conditional_branch(&kw)?;
                continue;
            }
            if self.check("else") {
                let kw = self.expect("else")?;
                self.emit(34, Some(&kw))?;
                self.expect("{")?;
                self.parse_block_statements()?;
                self.expect("}")?;
                self.emit(44, None)?;
            }
            break;
        }
        Ok(())
    }

    fn parse_conditional_branch(&mut self, keyword: &Token) -> Result<(), CompileError> {
        self.emit(34, Some(keyword))?;
        let lp = self.expect("(")?;
        self.emit(12, Some(&lp))?;
        self.parse_expression()?;
        let rp = self.expect(")")?;
        self.emit(13, Some(&rp))?;
        self.expect("{")?;
        self.parse_block_statements()?;
        self.expect("}")?;
        self.emit(44, None)
    }

    fn parse_while(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("while")?;
        self.emit(36, Some(&kw))?;
        let lp = self.expect("(")?;
        self.emit(12, Some(&lp))?;
        self.parse_expression()?;
        let rp = self.expect(")")?;
        self.emit(13, Some(&rp))?;
        self.expect("{")?;
        self.parse_block_statements()?;
        self.expect("}")?;
        self.emit(45, None)
    }

    fn parse_do_while(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("do")?;
        self.emit(35, Some(&kw))?;
        self.expect("{")?;
        self.parse_block_statements()?;
        self.expect("}")?;
        self.emit(46, None)?;
        let wk = self.expect("while")?;
        self.emit(36, Some(&wk))?;
        let lp = self.expect("(")?;
        self.emit(12, Some(&lp))?;
        self.parse_expression()?;
        let rp = self.expect(")")?;
        self.emit(13, Some(&rp))?;
        self.expect(";")?;
        self.emit(47, None)
    }

    fn parse_for(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("for")?;
        self.emit(37, Some(&kw))?;
        let lp = self.expect("(")?;
        self.emit(12, Some(&lp))?;

        // Init phase
        if !self.check(";") {
            if self.check("var") || self.check("const") {
                let kw = self.advance();
                self.emit(25, kw.as_ref())?;
            }
            let name = self.expect_identifier()?;
            self.emit(38, Some(&name))?;
            if self.match_lexeme(":") {
                let ty = self.expect_type_token()?;
                self.emit(39, Some(&ty))?;
                if self.match_lexeme("[") {
                    self.expect("]")?;
                }
            }
            if self.match_lexeme("=") {
                let value = match self.advance() {
                    Some(token) => token,
                    None => {
                        return Err(
                            self.syntactic("Fim de arquivo inesperado".to_string())
                        )
                    }
                };
                self.emit(40, Some(&value))?;
            }
        }
        let semi = self.expect(";")?;
        self.emit(42, Some(&semi))?;

        // Condition phase
        if !self.check(";") {
            self.parse_expression()?;
        }
        let semi = self.expect(";")?;
        self.emit(42, Some(&semi))?;

        // Update phase
        if !self.check(")") {
            if self.check("++") || self.check("--") {
                let op = self.advance();
                let name = self.expect_identifier()?;
                self.emit(24, Some(&name))?;
                self.emit(27, op.as_ref())?;
                self.emit(40, op.as_ref())?;
            } else {
                let name = self.expect_identifier()?;
                if self.check("++") || self.check("--") {
                    self.emit(24, Some(&name))?;
                    let op = self.advance();
                    self.emit(27, op.as_ref())?;
                    self.emit(40, op.as_ref())?;
                } else {
                    self.emit(22, Some(&name))?;
                    self.expect("=")?;
                    self.parse_expression()?;
                    self.emit(40, None)?;
                }
            }
        }
        let rp = self.expect(")")?;
        self.emit(13, Some(&rp))?;

        self.expect("{")?;
        self.parse_block_statements()?;
        self.expect("}")?;
        self.emit(48, None)
    }

    fn parse_switch(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("switch")?;
        self.emit(41, Some(&kw))?;
        let lp = self.expect("(")?;
        self.emit(12, Some(&lp))?;
        self.parse_expression()?;
        let rp = self.expect(")")?;
        self.emit(13, Some(&rp))?;
        self.expect("{")?;

        while self.check("case") {
            let ck = self.expect("case")?;
            self.emit(41, Some(&ck))?;
            let label = match self.advance() {
                Some(token) => token,
                None => return Err(self.syntactic("Fim de arquivo inesperado".to_string())),
            };
            self.emit(1, Some(&label))?;
            self.expect(":")?;
            while !self.at_end()
                && !self.check("case")
                && !self.check("default")
                && !self.check("}")
            {
                self.parse_statement()?;
            }
            self.emit(50, None)?;
        }
        if self.check("default") {
            let dk = self.expect("default")?;
            self.emit(41, Some(&dk))?;
            self.expect(":")?;
            while !self.at_end() && !self.check("}") {
                self.parse_statement()?;
            }
            self.emit(51, None)?;
        }
        self.expect("}")?;
        self.emit(49, None)
    }

    fn parse_function(&mut self) -> Result<(), CompileError> {
        let kw = self.expect("function")?;
        self.emit(30, Some(&kw))?;
        let name = self.expect_identifier()?;
        self.emit(23, Some(&name))?;
        self.expect("(")?;
        if !self.check(")") {
            loop {
                let param = self.expect_identifier()?;
                self.emit(22, Some(&param))?;
                self.expect(":")?;
                let ty = self.expect_type_token()?;
                self.emit(19, Some(&ty))?;
                if self.match_lexeme("[") {
                    self.expect("]")?;
                }
                if !self.match_lexeme(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        self.expect(":")?;
        let ret = self.expect_type_token()?;
        self.emit(19, Some(&ret))?;
        self.expect("{")?;
        self.parse_block_statements()?;
        self.expect("}")?;
        self.emit(43, None)
    }

    // ---- expressions ----------------------------------------------------

    fn binary_action(lexeme: &str) -> Option<i32> {
        match lexeme {
            "||" => Some(2),
            "&&" => Some(3),
            "|" => Some(4),
            "**" => Some(5),
            "&" => Some(6),
            "==" | "!=" | "<" | ">" | "<=" | ">=" => Some(7),
            "^" | "<<" | ">>" => Some(8),
            "+" | "-" => Some(9),
            "*" | "/" | "%" => Some(10),
            _ => None,
        }
    }

    fn parse_expression(&mut self) -> Result<(), CompileError> {
        self.parse_operand()?;
        while let Some(action) = self.peek_lexeme().and_then(Self::binary_action) {
            let op = match self.advance() {
                Some(token) => token,
                None => return Err(self.syntactic("Fim de arquivo inesperado".to_string())),
            };
            self.emit(action, Some(&op))?;
            self.parse_operand()?;
        }
        Ok(())
    }

    fn parse_operand(&mut self) -> Result<(), CompileError> {
        while matches!(self.peek_lexeme(), Some("!") | Some("~") | Some("-")) {
            let op = self.advance();
            self.emit(11, op.as_ref())?;
        }

        match self.peek_lexeme() {
            Some("(") => {
                let lp = self.expect("(")?;
                self.emit(12, Some(&lp))?;
                self.parse_expression()?;
                let rp = self.expect(")")?;
                self.emit(13, Some(&rp))
            }
            Some("[") => self.parse_array_literal(),
            Some("read") => {
                let kw = self.expect("read")?;
                self.expect("(")?;
                self.expect(")")?;
                self.emit(18, Some(&kw))
            }
            Some("true") | Some("false") | Some("null") => {
                let token = self.advance();
                self.emit(1, token.as_ref())
            }
            Some(lexeme) if lexeme.starts_with('"') || starts_numeric(lexeme) => {
                let token = self.advance();
                self.emit(1, token.as_ref())
            }
            Some(lexeme) if is_identifier(lexeme) && !KEYWORDS.contains(&lexeme) => {
                let name = match self.advance() {
                    Some(token) => token,
                    None => {
                        return Err(self.syntactic("Fim de arquivo inesperado".to_string()))
                    }
                };
                match self.peek_lexeme() {
                    Some("(") => {
                        self.emit(14, Some(&name))?;
                        let lp = self.expect("(")?;
                        self.emit(12, Some(&lp))?;
                        if !self.check(")") {
                            loop {
                                self.parse_expression()?;
                                if !self.match_lexeme(",") {
                                    break;
                                }
                            }
                        }
                        let rp = self.expect(")")?;
                        self.emit(13, Some(&rp))
                    }
                    Some("[") => {
                        self.emit(15, Some(&name))?;
                        self.expect("[")?;
                        self.parse_expression()?;
                        self.expect("]")?;
                        Ok(())
                    }
                    _ => self.emit(1, Some(&name)),
                }
            }
            Some(lexeme) => {
                Err(self.syntactic(format!("Operando inesperado: '{}'", lexeme)))
            }
            None => Err(self.syntactic("Fim de arquivo inesperado".to_string())),
        }
    }

    fn parse_array_literal(&mut self) -> Result<(), CompileError> {
        self.expect("[")?;
        if !self.check("]") {
            loop {
                let element = match self.peek() {
                    Some(token)
                        if token.lexeme.starts_with('"')
                            || starts_numeric(&token.lexeme)
                            || token.lexeme == "true"
                            || token.lexeme == "false"
                            || (is_identifier(&token.lexeme)
                                && !KEYWORDS.contains(&token.lexeme.as_str())) =>
                    {
                        token.clone()
                    }
                    Some(token) => {
                        return Err(self.syntactic(format!(
                            "Elemento de vetor inválido: '{}'",
                            token.lexeme
                        )))
                    }
                    None => {
                        return Err(
                            self.syntactic("Fim de arquivo inesperado".to_string())
                        )
                    }
                };
                self.pos += 1;
                self.emit(1, Some(&element))?;
                if !self.match_lexeme(",") {
                    break;
                }
            }
        }
        self.expect("]")?;
        Ok(())
    }
}

fn is_identifier(lexeme: &str) -> bool {
    let mut bytes = lexeme.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn starts_numeric(lexeme: &str) -> bool {
    lexeme.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::EventKind;
    use crate::types::Type;

    fn analyze(source: &str) -> Result<Analyzer, (Analyzer, CompileError)> {
        let mut analyzer = Analyzer::new();
        analyzer.set_source(source);
        match run(source, &mut analyzer) {
            Ok(()) => Ok(analyzer),
            Err(err) => Err((analyzer, err)),
        }
    }

    #[test]
    fn test_hello_world_is_clean() {
        let analyzer = analyze("print(\"Hello, World!\");").unwrap();
        assert!(analyzer.symbols().symbols().is_empty());
        assert!(analyzer.sink().entries().is_empty());
    }

    #[test]
    fn test_declare_then_assign_warns_unused() {
        let analyzer = analyze("var x: int = 1; x = 2;").unwrap();
        let symbols = analyzer.symbols().symbols();
        assert_eq!(symbols.len(), 1);
        let x = &symbols[0];
        assert_eq!(x.ty, Type::Int);
        assert_eq!(x.scope, 0);
        assert!(x.initialized);
        assert!(!x.used);
        assert!(!x.is_constant);
        let warnings: Vec<_> = analyzer.sink().entries().iter().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("não usado"));
        assert!(warnings[0].message.contains("'x'"));
        assert!(warnings[0].message.contains("(escopo 0)"));
    }

    #[test]
    fn test_constant_modification_fails() {
        let (analyzer, err) = analyze("const pi: float = 3.14; pi = 1.0;").unwrap_err();
        assert_eq!(err.kind(), "semantic");
        assert!(err.message().contains("modificar constante"));
        assert!(err.message().contains("'pi'"));
        let pi = analyzer.symbols().lookup("pi").unwrap();
        assert!(pi.is_constant);
    }

    #[test]
    fn test_float_to_int_initialisation_warns() {
        let analyzer = analyze("var x: int = 1.5; print(x);").unwrap();
        assert!(analyzer.symbols().lookup("x").unwrap().initialized);
        assert!(analyzer
            .sink()
            .entries()
            .iter()
            .any(|d| d.message.contains("Conversão implícita na inicialização de 'x'")));
    }

    #[test]
    fn test_array_declaration_and_indexed_store() {
        let analyzer = analyze("var a: int[] = [1,2,3]; a[1] = 10; print(a);").unwrap();
        let a = analyzer.symbols().lookup("a").unwrap();
        assert!(a.is_array && a.initialized);
        assert!(!analyzer.sink().has_errors());
        let events = analyzer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Declaration);
        assert!(events[0].literal_is_array);
        assert_eq!(events[1].kind, EventKind::Assignment);
    }

    #[test]
    fn test_undeclared_in_condition_points_at_use() {
        let source = "if (x < 10) { print(x); }";
        let (_, err) = analyze(source).unwrap_err();
        assert_eq!(err.kind(), "semantic");
        assert!(err.message().contains("não declarado"));
        assert!(err.message().contains("'x'"));
        assert_eq!(err.position() as usize, source.find('x').unwrap());
    }

    #[test]
    fn test_for_loop_declares_in_loop_scope() {
        let analyzer = analyze("for (var i: int = 0; i < 3; i++) { print(i); }").unwrap();
        let symbols = analyzer.symbols().symbols();
        assert_eq!(symbols.len(), 1);
        let i = &symbols[0];
        assert_eq!(i.name, "i");
        assert_eq!(i.scope, 1);
        assert!(i.initialized && i.used);
        assert!(!analyzer.sink().has_errors());
    }

    #[test]
    fn test_for_loop_assignment_update() {
        let analyzer =
            analyze("for (var i: int = 0; i < 3; i = i + 1) { print(i); }").unwrap();
        assert!(!analyzer.sink().has_errors());
        assert!(analyzer.symbols().symbols()[0].used);
    }

    #[test]
    fn test_shadowing_across_nested_blocks() {
        let analyzer = analyze("var x: int = 1; { var x: int = 2; print(x); } print(x);")
            .unwrap();
        let symbols = analyzer.symbols().symbols();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].scope, 0);
        assert_eq!(symbols[1].scope, 1);
        assert!(symbols[0].used && symbols[1].used);
        assert!(!analyzer.sink().has_errors());
    }

    #[test]
    fn test_duplicate_declaration_in_same_scope() {
        let (_, err) = analyze("var x: int = 1; var x: float = 2.0;").unwrap_err();
        assert!(err.message().contains("já declarado"));
    }

    #[test]
    fn test_while_loop_scope() {
        let analyzer =
            analyze("var n: int = 3; while (n > 0) { n = n - 1; print(n); }").unwrap();
        assert!(!analyzer.sink().has_errors());
        assert!(analyzer.symbols().lookup("n").unwrap().used);
    }

    #[test]
    fn test_do_while_condition_after_body() {
        let analyzer =
            analyze("var n: int = 0; do { n = n + 1; } while (n < 5); print(n);").unwrap();
        assert!(!analyzer.sink().has_errors());
    }

    #[test]
    fn test_switch_case_scopes() {
        let analyzer = analyze(
            "var x: int = 1; switch (x) { case 1: print(x); break; default: print(x); }",
        )
        .unwrap();
        assert!(!analyzer.sink().has_errors());
    }

    #[test]
    fn test_function_parameters_are_scoped() {
        let analyzer =
            analyze("function soma(a: int, b: int): int { return a + b; } soma();")
                .unwrap();
        let symbols = analyzer.symbols().symbols();
        let soma = analyzer.symbols().lookup("soma");
        assert!(soma.is_none(), "function scope closed at end of analysis");
        assert_eq!(symbols.len(), 3);
        assert!(symbols[0].is_function && symbols[0].is_constant);
        assert!(symbols[1].is_parameter && symbols[1].used);
        assert!(symbols[2].is_parameter && symbols[2].used);
    }

    #[test]
    fn test_function_blocks_closure_capture() {
        let (_, err) = analyze(
            "var fora: int = 1; function f(): void { print(fora); } f();",
        )
        .unwrap_err();
        assert!(err.message().contains("não declarado neste escopo"));
        assert!(err.message().contains("'fora'"));
    }

    #[test]
    fn test_read_statement_initialises_target() {
        let analyzer = analyze("var x: int = 0; read(x); print(x);").unwrap();
        assert!(analyzer.symbols().lookup("x").unwrap().initialized);
        assert!(!analyzer.sink().has_errors());
    }

    #[test]
    fn test_bitwise_ops_require_integers() {
        let (_, err) = analyze("var f: float = 1.0; var x: int = f & 2;").unwrap_err();
        assert!(err.message().contains("requer operandos inteiros"));
    }

    #[test]
    fn test_indexing_non_array_fails() {
        let (_, err) = analyze("var x: int = 1; var y: int = x[0];").unwrap_err();
        assert!(err.message().contains("não é um vetor"));
    }

    #[test]
    fn test_syntactic_error_reports_position() {
        let source = "var x: int = ;";
        let (_, err) = analyze(source).unwrap_err();
        assert_eq!(err.kind(), "syntactic");
        assert_eq!(err.position() as usize, source.find(';').unwrap());
    }

    #[test]
    fn test_unary_chain_types() {
        let analyzer = analyze("var b: bool = !!1; print(b);").unwrap();
        assert!(!analyzer.sink().has_errors());
        assert_eq!(analyzer.symbols().lookup("b").unwrap().ty, Type::Bool);
    }

    #[test]
    fn test_parenthesised_expression_feeds_outer() {
        let analyzer = analyze("var x: float = (1 + 2) * 1.5; print(x);").unwrap();
        assert!(!analyzer.sink().has_errors());
    }

    #[test]
    fn test_if_elif_else_chain() {
        let analyzer = analyze(
            "var x: int = 1; if (x < 0) { print(x); } elif (x == 0) { print(0); } else { print(1); }",
        )
        .unwrap();
        assert!(!analyzer.sink().has_errors());
    }

    #[test]
    fn test_string_comparison_is_rejected() {
        let (_, err) =
            analyze("var s: string = \"a\"; var b: bool = s < \"b\";").unwrap_err();
        assert!(err.message().contains("requer operandos numéricos"));
    }
}
