//! Statement intermediate representation.
//!
//! Immutable after parsing; procedure bodies are shared across interpreter
//! clones behind `Arc`. Every statement carries the source file and line it
//! was parsed from for error reporting.

use std::sync::Arc;

use crate::expression::Expression;

/// Built-in commands dispatched by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    // Path building.
    ClearPath,
    Move,
    Draw,
    Rdraw,
    Arc,
    Bezier,
    Ellipse,
    SineWave,
    ClosePath,
    AddPath,
    ShiftPath,
    // Built-in shapes.
    Box_,
    RoundedBox,
    Box3d,
    Circle,
    Cylinder,
    Raindrop,
    Wedge,
    Spiral,
    Hexagon,
    Pentagon,
    Triangle,
    Star,
    // Path rewriting.
    SamplePath,
    StripePath,
    ParallelPath,
    SelectPath,
    ReversePath,
    Sinkhole,
    Guillotine,
    // Drawing.
    Stroke,
    Fill,
    GradientFill,
    Clip,
    Protect,
    Unprotect,
    Label,
    FlowLabel,
    Print,
    Icon,
    GeoImage,
    Eps,
    Svg,
    SvgCode,
    Pdf,
    Table,
    Tree,
    EventScript,
    // Graphic and transform state.
    Color,
    Blend,
    Linestyle,
    Font,
    Justify,
    NewPage,
    EndPage,
    MimeType,
    Worlds,
    Project,
    Scale,
    Rotate,
    Eval,
    // Data.
    Dataset,
    Fetch,
    // Legend.
    Key,
    Legend,
}

impl CommandKind {
    /// Case-insensitive lookup; `name` must already be lowercased.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "clearpath" => Self::ClearPath,
            "move" => Self::Move,
            "draw" => Self::Draw,
            "rdraw" => Self::Rdraw,
            "arc" => Self::Arc,
            "bezier" => Self::Bezier,
            "ellipse" => Self::Ellipse,
            "sinewave" => Self::SineWave,
            "closepath" => Self::ClosePath,
            "addpath" => Self::AddPath,
            "shiftpath" => Self::ShiftPath,
            "box" => Self::Box_,
            "roundedbox" => Self::RoundedBox,
            "box3d" => Self::Box3d,
            "circle" => Self::Circle,
            "cylinder" => Self::Cylinder,
            "raindrop" => Self::Raindrop,
            "wedge" => Self::Wedge,
            "spiral" => Self::Spiral,
            "hexagon" => Self::Hexagon,
            "pentagon" => Self::Pentagon,
            "triangle" => Self::Triangle,
            "star" => Self::Star,
            "samplepath" => Self::SamplePath,
            "stripepath" => Self::StripePath,
            "parallelpath" => Self::ParallelPath,
            "selectpath" => Self::SelectPath,
            "reversepath" => Self::ReversePath,
            "sinkhole" => Self::Sinkhole,
            "guillotine" => Self::Guillotine,
            "stroke" => Self::Stroke,
            "fill" => Self::Fill,
            "gradientfill" => Self::GradientFill,
            "clip" => Self::Clip,
            "protect" => Self::Protect,
            "unprotect" => Self::Unprotect,
            "label" => Self::Label,
            "flowlabel" => Self::FlowLabel,
            "print" => Self::Print,
            "icon" => Self::Icon,
            "geoimage" => Self::GeoImage,
            "eps" => Self::Eps,
            "svg" => Self::Svg,
            "svgcode" => Self::SvgCode,
            "pdf" => Self::Pdf,
            "table" => Self::Table,
            "tree" => Self::Tree,
            "eventscript" => Self::EventScript,
            "color" | "colour" => Self::Color,
            "blend" => Self::Blend,
            "linestyle" => Self::Linestyle,
            "font" => Self::Font,
            "justify" => Self::Justify,
            "newpage" => Self::NewPage,
            "endpage" => Self::EndPage,
            "mimetype" => Self::MimeType,
            "worlds" => Self::Worlds,
            "project" => Self::Project,
            "scale" => Self::Scale,
            "rotate" => Self::Rotate,
            "eval" => Self::Eval,
            "dataset" => Self::Dataset,
            "fetch" => Self::Fetch,
            "key" => Self::Key,
            "legend" => Self::Legend,
            _ => return None,
        })
    }
}

/// A named procedure block.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Command(CommandKind, Vec<Expression>),
    /// `let name = value` or `let name[key] = value`.
    Assign {
        name: String,
        index: Option<Expression>,
        value: Expression,
    },
    /// `local a, b, c`.
    LocalDecl(Vec<String>),
    If {
        cond: Expression,
        then_block: Vec<Statement>,
        else_block: Vec<Statement>,
    },
    While {
        cond: Expression,
        body: Vec<Statement>,
    },
    Repeat {
        count: Expression,
        body: Vec<Statement>,
    },
    For {
        var: String,
        map: Expression,
        body: Vec<Statement>,
    },
    BlockDef(Arc<Block>),
    Call {
        name: String,
        args: Vec<Expression>,
    },
    Return,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub file: Arc<str>,
    pub line: u32,
}

impl Statement {
    pub fn new(kind: StatementKind, file: Arc<str>, line: u32) -> Self {
        Self { kind, file, line }
    }
}
