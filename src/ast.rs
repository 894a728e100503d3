use std::fmt;

use crate::token::{Token, TokenKind};
use crate::tree::{NodeId, SubTree, Tree};

/// Reserved words of the language. Everything else made of letters, digits
/// and underscores lexes as a NAME.
pub const KEYWORDS: &[&str] = &[
    "penup", "pendown", "home", "jump", "set", "repeat", "while", "if", "else", "do", "forward",
    "left", "right", "face", "red", "orange", "yellow", "green", "cyan", "blue", "purple",
    "magenta", "pink", "olive", "black", "gray", "white", "brown", "tan", "color", "def", "getX",
    "getY",
];

/// The fixed set of colours that can be selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Palette {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
    Pink,
    Olive,
    Black,
    Gray,
    White,
    Brown,
    Tan,
}

impl Palette {
    pub const ALL: [Palette; 15] = [
        Palette::Red,
        Palette::Orange,
        Palette::Yellow,
        Palette::Green,
        Palette::Cyan,
        Palette::Blue,
        Palette::Purple,
        Palette::Magenta,
        Palette::Pink,
        Palette::Olive,
        Palette::Black,
        Palette::Gray,
        Palette::White,
        Palette::Brown,
        Palette::Tan,
    ];

    pub fn from_name(name: &str) -> Option<Palette> {
        Palette::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Palette::Red => "red",
            Palette::Orange => "orange",
            Palette::Yellow => "yellow",
            Palette::Green => "green",
            Palette::Cyan => "cyan",
            Palette::Blue => "blue",
            Palette::Purple => "purple",
            Palette::Magenta => "magenta",
            Palette::Pink => "pink",
            Palette::Olive => "olive",
            Palette::Black => "black",
            Palette::Gray => "gray",
            Palette::White => "white",
            Palette::Brown => "brown",
            Palette::Tan => "tan",
        }
    }

    /// Packed `0xRRGGBB` value.
    pub fn rgb(self) -> u32 {
        match self {
            Palette::Red => 0xFF0000,
            Palette::Orange => 0xFFC800,
            Palette::Yellow => 0xFFFF00,
            Palette::Green => 0x00FF00,
            Palette::Cyan => 0x00FFFF,
            Palette::Blue => 0x0000FF,
            Palette::Purple => 0x8000FF,
            Palette::Magenta => 0xFF00FF,
            Palette::Pink => 0xFFAFAF,
            Palette::Olive => 0x808000,
            Palette::Black => 0x000000,
            Palette::Gray => 0x808080,
            Palette::White => 0xFFFFFF,
            Palette::Brown => 0x804000,
            Palette::Tan => 0xD2B48C,
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an AST node means, fixed when the parser creates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    // Structure
    Program,
    Block,
    List,
    Header,
    Def,

    // Motion
    Forward,
    Left,
    Right,
    Face,
    Home,
    Jump,

    // Pen & colour
    PenUp,
    PenDown,
    Color,
    NamedColor(Palette),

    // Statements
    Set,
    Repeat,
    While,
    If,
    Do,

    // Expressions
    Number,
    Name,
    GetX,
    GetY,
    Add,
    Sub,
    Mul,
    Div,

    // Comparators
    Less,
    Equal,
    Greater,

    /// Tokens that only delimit syntax (`{`, `(`, `else`, ...).
    Punctuation,
}

impl Kind {
    /// Classifies a token pushed by the parser. Structural tags never come
    /// from source text; they are created with [`AstNode::tag`].
    pub fn of(token: &Token) -> Kind {
        let text = token.text();
        match token.kind() {
            TokenKind::Number => Kind::Number,
            TokenKind::Name => Kind::Name,
            TokenKind::Keyword => match text {
                "forward" => Kind::Forward,
                "left" => Kind::Left,
                "right" => Kind::Right,
                "face" => Kind::Face,
                "home" => Kind::Home,
                "jump" => Kind::Jump,
                "penup" => Kind::PenUp,
                "pendown" => Kind::PenDown,
                "color" => Kind::Color,
                "set" => Kind::Set,
                "repeat" => Kind::Repeat,
                "while" => Kind::While,
                "if" => Kind::If,
                "do" => Kind::Do,
                "def" => Kind::Def,
                "getX" => Kind::GetX,
                "getY" => Kind::GetY,
                other => Palette::from_name(other)
                    .map(Kind::NamedColor)
                    .unwrap_or(Kind::Punctuation),
            },
            TokenKind::Symbol => match text {
                "+" => Kind::Add,
                "-" => Kind::Sub,
                "*" => Kind::Mul,
                "/" => Kind::Div,
                "<" => Kind::Less,
                "=" => Kind::Equal,
                ">" => Kind::Greater,
                _ => Kind::Punctuation,
            },
            TokenKind::EndOfLine | TokenKind::EndOfInput | TokenKind::Error => Kind::Punctuation,
        }
    }

    fn tag_name(self) -> Option<&'static str> {
        match self {
            Kind::Program => Some("program"),
            Kind::Block => Some("block"),
            Kind::List => Some("list"),
            Kind::Header => Some("header"),
            _ => None,
        }
    }
}

/// Value stored in each node of the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    kind: Kind,
    token: Token,
}

impl AstNode {
    pub fn new(token: Token) -> Self {
        AstNode {
            kind: Kind::of(&token),
            token,
        }
    }

    /// A structural node (`program`, `block`, `list`, `header`). Its token
    /// is a NAME spelling the tag.
    ///
    /// # Panics
    /// If `kind` is not one of the four structural kinds.
    pub fn tag(kind: Kind) -> Self {
        match kind.tag_name() {
            Some(name) => AstNode {
                kind,
                token: Token::name(name),
            },
            None => panic!("{kind:?} is not a structural tag"),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn text(&self) -> &str {
        self.token.text()
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// A parsed program: the syntax tree and its `program` root.
#[derive(Debug, Clone)]
pub struct Program {
    tree: Tree<AstNode>,
    root: NodeId,
}

impl Program {
    pub(crate) fn new(tree: Tree<AstNode>, root: NodeId) -> Self {
        Program { tree, root }
    }

    pub fn tree(&self) -> &Tree<AstNode> {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn syntax(&self) -> SubTree<'_, AstNode> {
        self.tree.subtree(self.root)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.syntax())
    }
}
