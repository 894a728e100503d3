use tracing::debug;

use crate::ast::{AstNode, KEYWORDS, Kind, Palette, Program};
use crate::error::{SyntaxError, TreeError};
use crate::lexer::Lexer;
use crate::token::TokenKind;
use crate::tree::{NodeId, SubTree, Tree};

/// Outcome of a grammar predicate: `Ok(true)` if the rule matched and left
/// its tree on the stack, `Ok(false)` if it did not match and consumed
/// nothing, `Err` once the input can no longer be a valid program.
pub type Rule = Result<bool, SyntaxError>;

/// Recursive-descent recogniser for turtle programs.
///
/// Every `is_*` method recognises one nonterminal at the current lexer
/// position. Recognised pieces are assembled bottom-up on a shared stack of
/// subtree roots; [`Parser::make_tree`] combines the top entries into a new
/// node. Punctuation (`{`, `(`, `else`, newlines) is consumed but never
/// pushed.
pub struct Parser {
    lexer: Lexer,
    tree: Tree<AstNode>,
    stack: Vec<NodeId>,
}

/// Parses a complete program.
///
/// A final newline is supplied if the source lacks one.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let mut parser = if source.ends_with('\n') {
        Parser::new(source)
    } else {
        Parser::new(&format!("{source}\n"))
    };
    if !parser.is_program()? {
        return Err(parser.error("Expected at least one command"));
    }
    let program = parser.into_program()?;
    debug!(nodes = program.tree().len(), "parsed program");
    Ok(program)
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            lexer: Lexer::new(source, KEYWORDS.iter().copied()),
            tree: Tree::new(),
            stack: Vec::new(),
        }
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer {
        &mut self.lexer
    }

    pub fn tree(&self) -> &Tree<AstNode> {
        &self.tree
    }

    /// Subtree roots, bottom first.
    pub fn stack(&self) -> &[NodeId] {
        &self.stack
    }

    pub fn stack_top(&self) -> Option<SubTree<'_, AstNode>> {
        self.stack.last().map(|&id| self.tree.subtree(id))
    }

    /// Takes the tree on top of the stack as a finished program.
    pub fn into_program(mut self) -> Result<Program, SyntaxError> {
        let root = self.pop()?;
        Ok(Program::new(self.tree, root))
    }

    // Program structure

    /// `program := command+ procedure* END-OF-INPUT`, after any blank lines.
    pub fn is_program(&mut self) -> Rule {
        self.is_eol()?;
        if !self.is_command()? {
            return Ok(false);
        }
        let mut commands = vec![self.pop()?];
        while self.is_command()? {
            commands.push(self.pop()?);
        }
        let mut procedures = Vec::new();
        while self.is_procedure()? {
            procedures.push(self.pop()?);
        }
        if !self.accept(TokenKind::EndOfInput, None) {
            return Err(self.error("Unexpected terms in program"));
        }
        let block = self.tagged(Kind::Block, &commands)?;
        let list = self.tagged(Kind::List, &procedures)?;
        let program = self.tagged(Kind::Program, &[block, list])?;
        self.stack.push(program);
        Ok(true)
    }

    pub fn is_command(&mut self) -> Rule {
        if self.is_move()?
            || self.is_penup()?
            || self.is_pendown()?
            || self.is_home()?
            || self.is_jump()?
            || self.is_set()?
            || self.is_repeat()?
            || self.is_while()?
            || self.is_if()?
            || self.is_do()?
        {
            return Ok(true);
        }
        if !self.is_color()? {
            return Ok(false);
        }
        self.expect(Self::is_eol, "Expected newline after color")?;
        Ok(true)
    }

    /// `procedure := "def" NAME variable* block`
    pub fn is_procedure(&mut self) -> Rule {
        if !self.is_keyword("def") {
            return Ok(false);
        }
        self.expect(Self::is_name, "No name found after 'def'")?;
        let name = self.pop()?;
        let mut params = Vec::new();
        while self.is_variable()? {
            params.push(self.pop()?);
        }
        let list = self.tagged(Kind::List, &params)?;
        let header = self.tagged(Kind::Header, &[name, list])?;
        self.stack.push(header);
        self.expect(Self::is_block, "Missing block in procedure")?;
        self.make_tree(3, &[2, 1])?;
        Ok(true)
    }

    /// `block := "{" EOL command* "}" EOL`
    pub fn is_block(&mut self) -> Rule {
        if !self.accept(TokenKind::Symbol, Some("{")) {
            return Ok(false);
        }
        self.expect(Self::is_eol, "Expected newline after '{'")?;
        let mut commands = Vec::new();
        while self.is_command()? {
            commands.push(self.pop()?);
        }
        let block = self.tagged(Kind::Block, &commands)?;
        self.stack.push(block);
        if !self.accept(TokenKind::Symbol, Some("}")) {
            return Err(self.error("No '}' found in block"));
        }
        self.expect(Self::is_eol, "Expected newline after '}'")?;
        Ok(true)
    }

    /// One or more line ends; consecutive ones collapse. Leaves nothing on
    /// the stack.
    pub fn is_eol(&mut self) -> Rule {
        if !self.accept(TokenKind::EndOfLine, None) {
            return Ok(false);
        }
        while self.accept(TokenKind::EndOfLine, None) {}
        Ok(true)
    }

    // Commands

    pub fn is_move(&mut self) -> Rule {
        if !(self.is_keyword("forward")
            || self.is_keyword("right")
            || self.is_keyword("left")
            || self.is_keyword("face"))
        {
            return Ok(false);
        }
        self.expect(Self::is_expression, "No expression found after move")?;
        self.expect(Self::is_eol, "No newline found after move")?;
        self.make_tree(2, &[1])?;
        Ok(true)
    }

    /// A bare palette name, or `color r g b`. The trailing newline belongs
    /// to `is_command`.
    pub fn is_color(&mut self) -> Rule {
        if Palette::ALL.iter().any(|p| self.is_keyword(p.name())) {
            return Ok(true);
        }
        if !self.is_keyword("color") {
            return Ok(false);
        }
        self.expect(Self::is_expression, "No expression found in color")?;
        self.expect(Self::is_expression, "Second expression not found in color")?;
        self.expect(Self::is_expression, "Third expression not found in color")?;
        self.make_tree(4, &[3, 2, 1])?;
        Ok(true)
    }

    pub fn is_penup(&mut self) -> Rule {
        self.is_bare_command("penup")
    }

    pub fn is_pendown(&mut self) -> Rule {
        self.is_bare_command("pendown")
    }

    pub fn is_home(&mut self) -> Rule {
        self.is_bare_command("home")
    }

    pub fn is_jump(&mut self) -> Rule {
        if !self.is_keyword("jump") {
            return Ok(false);
        }
        self.expect(Self::is_expression, "No expression found after 'jump'")?;
        self.expect(Self::is_expression, "Second expression not found in 'jump'")?;
        self.expect(Self::is_eol, "No newline found in 'jump'")?;
        self.make_tree(3, &[2, 1])?;
        Ok(true)
    }

    pub fn is_set(&mut self) -> Rule {
        if !self.is_keyword("set") {
            return Ok(false);
        }
        self.expect(Self::is_variable, "No variable found after 'set'")?;
        self.expect(Self::is_expression, "No expression found in 'set'")?;
        self.expect(Self::is_eol, "No newline found in 'set'")?;
        self.make_tree(3, &[2, 1])?;
        Ok(true)
    }

    pub fn is_repeat(&mut self) -> Rule {
        if !self.is_keyword("repeat") {
            return Ok(false);
        }
        self.expect(Self::is_expression, "No expression found after 'repeat'")?;
        self.expect(Self::is_block, "No block found in 'repeat'")?;
        self.make_tree(3, &[2, 1])?;
        Ok(true)
    }

    pub fn is_while(&mut self) -> Rule {
        if !self.is_keyword("while") {
            return Ok(false);
        }
        self.expect(Self::is_condition, "No condition found after 'while'")?;
        self.expect(Self::is_block, "No block found in 'while'")?;
        self.make_tree(3, &[2, 1])?;
        Ok(true)
    }

    pub fn is_if(&mut self) -> Rule {
        if !self.is_keyword("if") {
            return Ok(false);
        }
        self.expect(Self::is_condition, "No condition found after 'if'")?;
        self.expect(Self::is_block, "No block found after 'if'")?;
        if self.accept(TokenKind::Keyword, Some("else")) {
            self.expect(Self::is_block, "No block found after 'else'")?;
            self.make_tree(4, &[3, 2, 1])?;
        } else {
            self.make_tree(3, &[2, 1])?;
        }
        Ok(true)
    }

    /// `do := "do" NAME expression* EOL`; the arguments are gathered in a
    /// `list` node.
    pub fn is_do(&mut self) -> Rule {
        if !self.is_keyword("do") {
            return Ok(false);
        }
        self.expect(Self::is_name, "No name found after 'do'")?;
        let mut args = Vec::new();
        while self.is_expression()? {
            args.push(self.pop()?);
        }
        let list = self.tagged(Kind::List, &args)?;
        self.stack.push(list);
        self.expect(Self::is_eol, "No newline found after 'do'")?;
        self.make_tree(3, &[2, 1])?;
        Ok(true)
    }

    // Conditions & expressions

    pub fn is_condition(&mut self) -> Rule {
        if !self.is_expression()? {
            return Ok(false);
        }
        self.expect(Self::is_comparator, "No comparator found")?;
        self.expect(Self::is_expression, "No expression found after comparator")?;
        self.make_tree(2, &[3, 1])?;
        Ok(true)
    }

    pub fn is_comparator(&mut self) -> Rule {
        Ok(self.is_symbol("<") || self.is_symbol("=") || self.is_symbol(">"))
    }

    /// `expression := term { ("+"|"-") unsigned-term }`
    pub fn is_expression(&mut self) -> Rule {
        if !self.is_term()? {
            return Ok(false);
        }
        while self.is_add_operator()? {
            self.expect(Self::is_unsigned_term, "Error in expression after '+' or '-'")?;
            self.make_tree(2, &[3, 1])?;
        }
        Ok(true)
    }

    /// `term := factor { ("*"|"/") unsigned-factor }`
    pub fn is_term(&mut self) -> Rule {
        if !self.is_factor()? {
            return Ok(false);
        }
        self.multiply_tail()?;
        Ok(true)
    }

    /// `factor := ["+"|"-"] unsigned-factor`; a sign becomes a one-child
    /// operator node.
    pub fn is_factor(&mut self) -> Rule {
        let signed = self.is_add_operator()?;
        if self.is_unsigned_factor()? {
            if signed {
                self.make_tree(2, &[1])?;
            }
            return Ok(true);
        }
        if signed {
            return Err(self.error("Sign not followed by a factor"));
        }
        Ok(false)
    }

    pub fn is_add_operator(&mut self) -> Rule {
        Ok(self.is_symbol("+") || self.is_symbol("-"))
    }

    pub fn is_multiply_operator(&mut self) -> Rule {
        Ok(self.is_symbol("*") || self.is_symbol("/"))
    }

    pub fn is_variable(&mut self) -> Rule {
        self.is_name()
    }

    fn is_unsigned_term(&mut self) -> Rule {
        if !self.is_unsigned_factor()? {
            return Ok(false);
        }
        self.multiply_tail()?;
        Ok(true)
    }

    fn multiply_tail(&mut self) -> Result<(), SyntaxError> {
        while self.is_multiply_operator()? {
            self.expect(Self::is_unsigned_factor, "No term after '*' or '/'")?;
            self.make_tree(2, &[3, 1])?;
        }
        Ok(())
    }

    fn is_unsigned_factor(&mut self) -> Rule {
        if self.is_name()?
            || self.next_matches(TokenKind::Number, None)
            || self.is_keyword("getX")
            || self.is_keyword("getY")
        {
            return Ok(true);
        }
        if !self.accept(TokenKind::Symbol, Some("(")) {
            return Ok(false);
        }
        self.expect(Self::is_expression, "Error in parenthesized expression")?;
        if !self.accept(TokenKind::Symbol, Some(")")) {
            return Err(self.error("Unclosed parenthetical expression"));
        }
        Ok(true)
    }

    fn is_name(&mut self) -> Rule {
        Ok(self.next_matches(TokenKind::Name, None))
    }

    fn is_bare_command(&mut self, keyword: &str) -> Rule {
        if !self.is_keyword(keyword) {
            return Ok(false);
        }
        self.expect(Self::is_eol, &format!("No newline found after '{keyword}'"))?;
        Ok(true)
    }

    // Stack & token helpers

    /// Replaces the top stack entries with a single tree.
    ///
    /// Positions count from the top of the stack, 1 being the top. `root`
    /// and `children` together must name each of the top
    /// `children.len() + 1` entries exactly once; the children are attached
    /// in the order given.
    pub fn make_tree(&mut self, root: usize, children: &[usize]) -> Result<(), SyntaxError> {
        let count = children.len() + 1;
        if count > self.stack.len() {
            return Err(self.error("internal: stack too shallow to build tree"));
        }
        let mut used = vec![false; count];
        for &pos in std::iter::once(&root).chain(children) {
            if pos == 0 || pos > count || used[pos - 1] {
                return Err(self.error(&format!(
                    "internal: bad tree positions {root} {children:?}"
                )));
            }
            used[pos - 1] = true;
        }

        let depth = self.stack.len();
        let root_id = self.stack[depth - root];
        let child_ids: Vec<NodeId> = children.iter().map(|&pos| self.stack[depth - pos]).collect();
        self.stack.truncate(depth - count);
        self.tree
            .add_children(root_id, &child_ids)
            .map_err(|e| self.internal(e))?;
        self.stack.push(root_id);
        Ok(())
    }

    fn expect<F>(&mut self, rule: F, message: &str) -> Result<(), SyntaxError>
    where
        F: FnOnce(&mut Self) -> Rule,
    {
        if rule(self)? {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn pop(&mut self) -> Result<NodeId, SyntaxError> {
        match self.stack.pop() {
            Some(id) => Ok(id),
            None => Err(self.error("internal: parse stack is empty")),
        }
    }

    fn tagged(&mut self, kind: Kind, children: &[NodeId]) -> Result<NodeId, SyntaxError> {
        self.tree
            .node(AstNode::tag(kind), children)
            .map_err(|e| self.internal(e))
    }

    fn is_keyword(&mut self, word: &str) -> bool {
        self.next_matches(TokenKind::Keyword, Some(word))
    }

    fn is_symbol(&mut self, symbol: &str) -> bool {
        self.next_matches(TokenKind::Symbol, Some(symbol))
    }

    /// Consumes the next token and pushes it as a leaf if it matches.
    fn next_matches(&mut self, kind: TokenKind, text: Option<&str>) -> bool {
        if !self.lexer.has_next() {
            return false;
        }
        let token = self.lexer.next_token();
        if token.kind() == kind && text.is_none_or(|t| t == token.text()) {
            let leaf = self.tree.leaf(AstNode::new(token));
            self.stack.push(leaf);
            true
        } else {
            self.lexer.push_back();
            false
        }
    }

    /// Consumes the next token if it matches, without pushing anything.
    fn accept(&mut self, kind: TokenKind, text: Option<&str>) -> bool {
        if !self.lexer.has_next() {
            return false;
        }
        let token = self.lexer.next_token();
        if token.kind() == kind && text.is_none_or(|t| t == token.text()) {
            true
        } else {
            self.lexer.push_back();
            false
        }
    }

    fn error(&self, message: &str) -> SyntaxError {
        let entries: Vec<String> = self
            .stack
            .iter()
            .map(|&id| self.tree.subtree(id).describe())
            .collect();
        SyntaxError {
            message: message.to_string(),
            line: self.lexer.token_line(),
            stack: format!("[{}]", entries.join(", ")),
        }
    }

    fn internal(&self, err: TreeError) -> SyntaxError {
        self.error(&format!("internal: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn one_token(word: &str) -> Token {
        Lexer::new(word, KEYWORDS.iter().copied()).next_token()
    }

    #[track_caller]
    fn assert_stack_top(parser: &Parser, description: &str) {
        let (words, root) = Tree::parse(description).unwrap();
        let expected = words.map(|w| one_token(w));
        let actual = parser.tree().map(|n| n.token().clone());
        let top = *parser.stack().last().expect("stack is empty");
        assert!(
            actual.subtree(top) == expected.subtree(root),
            "expected {description}, got {}",
            actual.subtree(top).describe()
        );
    }

    #[track_caller]
    fn unconsumed_tokens_should_be(parser: &mut Parser, expected: &str) {
        let wanted = Lexer::new(expected, KEYWORDS.iter().copied()).tokenize();
        let lexer = parser.lexer_mut();
        for token in wanted {
            assert!(lexer.has_next());
            assert_eq!(lexer.next_token(), token);
        }
    }

    /// Every predicate must refuse `#` without consuming it.
    fn rejects_hash(rule: fn(&mut Parser) -> Rule) {
        let mut p = Parser::new("#");
        assert!(!rule(&mut p).unwrap());
        assert!(p.stack().is_empty());
        unconsumed_tokens_should_be(&mut p, "#");
    }

    #[test]
    fn test_parser_constructs() {
        Parser::new("");
        Parser::new("2 + 2");
    }

    #[test]
    fn test_is_move() {
        for (src, want) in [
            ("forward 3\n", "forward(3)"),
            ("left 3+2\n", "left(+(3 2))"),
            ("right 3*a+2\n", "right(+(*(3 a) 2))"),
            ("face abc\n", "face(abc)"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_move().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_move);
    }

    #[test]
    fn test_is_eol() {
        let mut p = Parser::new("\n \n \n");
        assert!(p.is_eol().unwrap());
        assert!(p.stack().is_empty());
        unconsumed_tokens_should_be(&mut p, "");
        rejects_hash(Parser::is_eol);
    }

    #[test]
    fn test_is_color() {
        for (src, want) in [
            ("color 125 0 225 \n", "color(125 0 225)"),
            ("red \n", "red"),
            ("blue \n", "blue"),
            ("black \n", "black"),
            ("gray \n", "gray"),
            ("tan \n", "tan"),
            ("color x 0 x+y*z \n", "color(x 0 +(x *(y z)))"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_color().unwrap());
            assert_stack_top(&p, want);
        }
        let mut p = Parser::new("magenta\n");
        p.is_color().unwrap();
        assert_eq!(
            p.stack_top().map(|t| t.value().kind()),
            Some(Kind::NamedColor(Palette::Magenta))
        );
        rejects_hash(Parser::is_color);
    }

    #[test]
    fn test_bare_commands() {
        let mut p = Parser::new("penup \n");
        assert!(p.is_penup().unwrap());
        assert_stack_top(&p, "penup");

        let mut p = Parser::new("pendown \n");
        assert!(p.is_pendown().unwrap());
        assert_stack_top(&p, "pendown");

        let mut p = Parser::new("home \n");
        assert!(p.is_home().unwrap());
        assert_stack_top(&p, "home");

        rejects_hash(Parser::is_penup);
        rejects_hash(Parser::is_pendown);
        rejects_hash(Parser::is_home);
    }

    #[test]
    fn test_is_jump() {
        for (src, want) in [
            ("jump 2 3 \n", "jump(2 3)"),
            ("jump 2+3 3*5+4 \n", "jump(+(2 3) +(*(3 5) 4))"),
            ("jump abc 3+x \n", "jump(abc +(3 x))"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_jump().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_jump);
    }

    #[test]
    fn test_is_set() {
        for (src, want) in [
            ("set w 5\n", "set(w 5)"),
            ("set w 5+2\n", "set(w +(5 2))"),
            ("set w a+b*c\n", "set(w +(a *(b c)))"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_set().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_set);
    }

    #[test]
    fn test_is_repeat() {
        for (src, want) in [
            ("repeat 2 {\n penup\n }\n \n", "repeat(2 block(penup))"),
            ("repeat 2+abc {\n  }\n \n", "repeat(+(2 abc) block())"),
            (
                "repeat 2+abc {\n penup\n pendown\n home\n }\n \n",
                "repeat(+(2 abc) block(penup pendown home))",
            ),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_repeat().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_repeat);
    }

    #[test]
    fn test_is_while() {
        for (src, want) in [
            ("while 3 > 2 {\n penup\n }\n", "while(>(3 2) block(penup))"),
            (
                "while a = 2 {\n penup\n pendown\n }\n",
                "while(=(a 2) block(penup pendown))",
            ),
            ("while a < b {\n }\n", "while(<(a b) block())"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_while().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_while);
    }

    #[test]
    fn test_is_if() {
        for (src, want) in [
            ("if 2 < 3 {\n penup\n }\n", "if(<(2 3) block(penup))"),
            (
                "if a < 3 {\n penup\n pendown\n }\n",
                "if(<(a 3) block(penup pendown))",
            ),
            (
                "if 2 < 3 {\n penup\n }\n else {\n pendown\n }\n",
                "if(<(2 3) block(penup) block(pendown))",
            ),
            (
                "if a < 3 {\n penup\n }\n else {\n }\n",
                "if(<(a 3) block(penup) block())",
            ),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_if().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_if);
    }

    #[test]
    fn test_is_do() {
        for (src, want) in [
            ("do foo 1 2 3\n", "do(foo list(1 2 3))"),
            ("do foo \n", "do(foo list())"),
            ("do foo 1 2+3*4\n", "do(foo list(1 +(2 *(3 4))))"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_do().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_do);
    }

    #[test]
    fn test_is_block() {
        for (src, want) in [
            ("{\n }\n", "block()"),
            ("{\n penup\n pendown\n }\n", "block(penup pendown)"),
            (
                "{\n repeat 5 {\n penup\n pendown\n }\n }\n",
                "block(repeat(5 block(penup pendown)))",
            ),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_block().unwrap());
            assert_stack_top(&p, want);
            assert_eq!(p.stack().len(), 1);
        }
        rejects_hash(Parser::is_block);
    }

    #[test]
    fn test_is_comparator() {
        let mut p = Parser::new("< > =");
        assert!(p.is_comparator().unwrap());
        assert_stack_top(&p, "<");
        assert!(p.is_comparator().unwrap());
        assert_stack_top(&p, ">");
        assert!(p.is_comparator().unwrap());
        assert_stack_top(&p, "=");
        rejects_hash(Parser::is_comparator);
    }

    #[test]
    fn test_is_condition() {
        for (src, want) in [
            ("a > b", ">(a b)"),
            ("a = 3 + 2", "=(a +(3 2))"),
            ("a*b+4 = 3 + 2", "=(+(*(a b) 4) +(3 2))"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_condition().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_condition);
    }

    #[test]
    fn test_is_procedure() {
        for (src, want) in [
            (
                "def foo a b c { \n forward b \n}\n",
                "def(header(foo list(a b c)) block(forward(b)))",
            ),
            ("def foo { \n penup\n }\n", "def(header(foo list()) block(penup))"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_procedure().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_procedure);
    }

    #[test]
    fn test_is_command() {
        for (src, want) in [
            ("penup \n", "penup"),
            ("red \n", "red"),
            ("if a > 3 {\n face 4\n }\n \n", "if(>(a 3) block(face(4)))"),
            ("while a = 2 {\n face 4\n }\n \n", "while(=(a 2) block(face(4)))"),
            ("set x 5 \n", "set(x 5)"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_command().unwrap());
            assert_stack_top(&p, want);
        }
        rejects_hash(Parser::is_command);
    }

    #[test]
    fn test_is_program() {
        for (src, want) in [
            ("penup \n home \n", "program(block(penup home) list())"),
            ("penup \n left x+3 \n", "program(block(penup left(+(x 3))) list())"),
            (
                "penup \n home \n \n def foo x y z { \n left x \n } \n",
                "program(block(penup home) list(def(header(foo list(x y z)) block(left(x)))))",
            ),
            ("\n\n// leading comment\nhome\n", "program(block(home) list())"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_program().unwrap());
            assert_stack_top(&p, want);
            assert_eq!(p.stack().len(), 1);
        }
        rejects_hash(Parser::is_program);
    }

    #[test]
    fn test_is_expression() {
        for (src, want) in [
            ("250", "250"),
            ("hello", "hello"),
            ("(xyz + 3)", "+(xyz 3)"),
            ("a + b + c", "+(+(a b) c)"),
            ("3 * 12 - 7", "-(*(3 12) 7)"),
            ("12 * 5 - 3 * 4 / 6 + 8", "+( -(*(12 5) /(*(3 4) 6)) 8)"),
            ("12 * ((5 - 3) * 4) / 6 + (8)", "+(/(*(12 *(-(5 3) 4)) 6) 8)"),
            ("-3 + 4", "+(-(3) 4)"),
            ("+x", "+(x)"),
            ("getX - getY", "-(getX getY)"),
            ("(-a) * 2", "*(-(a) 2)"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_expression().unwrap(), "{src}");
            assert_stack_top(&p, want);
        }
        let mut p = Parser::new("");
        assert!(!p.is_expression().unwrap());
        rejects_hash(Parser::is_expression);
    }

    #[test]
    fn test_trailing_operator_is_an_error() {
        assert!(Parser::new("17 +").is_expression().is_err());
        assert!(Parser::new("22 *").is_expression().is_err());
    }

    #[test]
    fn test_sign_only_leads_an_expression() {
        assert!(Parser::new("3 - -2").is_expression().is_err());
        assert!(Parser::new("3 * -2").is_expression().is_err());
        assert!(Parser::new("- *").is_expression().is_err());
    }

    #[test]
    fn test_is_term() {
        for (src, want) in [
            ("12", "12"),
            ("3*12", "*(3 12)"),
            ("u * v * z", "*(*(u v) z)"),
            ("20 * 3 / 4", "/(*(20 3) 4)"),
        ] {
            let mut p = Parser::new(src);
            assert!(p.is_term().unwrap());
            assert_stack_top(&p, want);
        }

        let mut p = Parser::new("20 * 3 / 4 + 5");
        assert!(p.is_term().unwrap());
        assert_stack_top(&p, "/(*(20 3) 4)");
        unconsumed_tokens_should_be(&mut p, "+ 5");

        let mut p = Parser::new("");
        assert!(!p.is_term().unwrap());
        unconsumed_tokens_should_be(&mut p, "");
        rejects_hash(Parser::is_term);
    }

    #[test]
    fn test_is_factor() {
        for (src, want) in [("12", "12"), ("hello", "hello"), ("(xyz + 3)", "+(xyz 3)")] {
            let mut p = Parser::new(src);
            assert!(p.is_factor().unwrap());
            assert_stack_top(&p, want);
        }

        let mut p = Parser::new("12 * 5");
        assert!(p.is_factor().unwrap());
        assert_stack_top(&p, "12");
        unconsumed_tokens_should_be(&mut p, "* 5");

        let mut p = Parser::new("17 +");
        assert!(p.is_factor().unwrap());
        assert_stack_top(&p, "17");
        unconsumed_tokens_should_be(&mut p, "+");

        let mut p = Parser::new("");
        assert!(!p.is_factor().unwrap());
        unconsumed_tokens_should_be(&mut p, "");
        rejects_hash(Parser::is_factor);
    }

    #[test]
    fn test_operators() {
        let mut p = Parser::new("+ - + $");
        assert!(p.is_add_operator().unwrap());
        assert_stack_top(&p, "+");
        assert!(p.is_add_operator().unwrap());
        assert_stack_top(&p, "-");
        assert!(p.is_add_operator().unwrap());
        assert!(!p.is_add_operator().unwrap());
        unconsumed_tokens_should_be(&mut p, "$");

        let mut p = Parser::new("* / $");
        assert!(p.is_multiply_operator().unwrap());
        assert!(p.is_multiply_operator().unwrap());
        assert!(!p.is_multiply_operator().unwrap());
        unconsumed_tokens_should_be(&mut p, "$");
    }

    #[test]
    fn test_is_variable() {
        let mut p = Parser::new("hello   list abc123 header _");
        for _ in 0..5 {
            assert!(p.is_variable().unwrap());
        }
        assert!(!p.is_variable().unwrap());
    }

    #[test]
    fn test_make_tree_positions() {
        let mut p = Parser::new("a b c");
        for _ in 0..3 {
            assert!(p.is_variable().unwrap());
        }
        assert!(p.make_tree(1, &[1]).is_err());
        assert!(p.make_tree(4, &[1, 2]).is_err());
        p.make_tree(2, &[3, 1]).unwrap();
        assert_stack_top(&p, "b(a c)");
        assert_eq!(p.stack().len(), 1);
        assert!(p.make_tree(2, &[1]).is_err());
    }

    #[test]
    fn test_parse_appends_final_newline() {
        let program = parse("forward 10").unwrap();
        assert_eq!(
            program.syntax().describe(),
            "program(block(forward(10)) list)"
        );
    }

    #[test]
    fn test_parse_tags_are_structural() {
        let program = parse("set block 1\n").unwrap();
        let tree = program.tree();
        let root = program.root();
        assert_eq!(tree.value(root).kind(), Kind::Program);
        let block = tree.child(root, 0).unwrap();
        assert_eq!(tree.value(block).kind(), Kind::Block);
        let set = tree.child(block, 0).unwrap();
        let var = tree.child(set, 0).unwrap();
        assert_eq!(tree.value(var).kind(), Kind::Name);
        assert_eq!(tree.value(var).text(), "block");
    }

    #[test]
    fn test_syntax_error_reports_line_and_stack() {
        let err = parse("penup\nrepeat 3 forward 1\n").unwrap_err();
        assert_eq!(err.message, "No block found in 'repeat'");
        assert_eq!(err.line, 2);
        assert_eq!(err.stack, "[repeat, 3]");
        assert!(err.to_string().ends_with("; stack = [repeat, 3]"));
    }

    #[test]
    fn test_error_at_line_end_reports_that_line() {
        let err = parse("home\nforward 3 +\n").unwrap_err();
        assert_eq!(err.message, "Error in expression after '+' or '-'");
        assert_eq!(err.line, 2);

        let err = parse("repeat 3\n\n\nforward 1\n").unwrap_err();
        assert_eq!(err.message, "No block found in 'repeat'");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_commands_must_precede_procedures() {
        let err = parse("penup\ndef f {\n}\nhome\n").unwrap_err();
        assert_eq!(err.message, "Unexpected terms in program");
        assert!(parse("def f {\n}\nhome\n").is_err());
    }

    #[test]
    fn test_rejected_programs() {
        for src in [
            "",
            "\n\n",
            "forward\n",
            "forward 12ef\n",
            "color 1 2\n",
            "red blue\n",
            "repeat 3 {\nhome\n",
            "if 1 {\n}\n",
            "do 3\n",
            "set 3 4\n",
            "forward (1 + 2\n",
            "home extra\n",
        ] {
            assert!(parse(src).is_err(), "{src:?} should be rejected");
        }
    }
}
