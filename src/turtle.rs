use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::ast::Palette;

/// Drawing capability driven by the interpreter.
///
/// Angles are in degrees. Positions use mathematical orientation: x grows to
/// the right, y grows upwards, heading 0 points along +x.
pub trait Turtle {
    fn pen_up(&mut self);
    fn pen_down(&mut self);
    fn forward(&mut self, distance: f64);
    fn turn_left(&mut self, degrees: f64);
    fn turn_right(&mut self, degrees: f64);
    /// Sets the heading absolutely.
    fn face(&mut self, degrees: f64);
    fn jump_to(&mut self, x: f64, y: f64);
    fn home(&mut self);
    fn set_color_by_name(&mut self, color: Palette);
    /// `rgb` is packed as `0xRRGGBB`.
    fn set_color_by_rgb(&mut self, rgb: u32);
    fn x(&self) -> f64;
    fn y(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", trim(self.x), trim(self.y))
    }
}

/// One observable effect of a turtle command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Line { from: Point, to: Point, color: u32 },
    MoveTo { to: Point },
    Heading { degrees: f64 },
    PenUp,
    PenDown,
    Color { rgb: u32 },
}

impl fmt::Display for DrawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawCommand::Line { from, to, color } => {
                write!(f, "line {from} -> {to} #{color:06X}")
            }
            DrawCommand::MoveTo { to } => write!(f, "move {to}"),
            DrawCommand::Heading { degrees } => write!(f, "heading {}", trim(*degrees)),
            DrawCommand::PenUp => write!(f, "pen up"),
            DrawCommand::PenDown => write!(f, "pen down"),
            DrawCommand::Color { rgb } => write!(f, "color #{rgb:06X}"),
        }
    }
}

/// Rounds away floating-point noise such as `99.99999999999999` for display.
fn trim(v: f64) -> f64 {
    let rounded = (v * 1e9).round() / 1e9;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Headless turtle that keeps its pose and records what it would draw.
#[derive(Debug, Clone)]
pub struct Recorder {
    position: Point,
    heading: f64,
    pen_down: bool,
    color: u32,
    commands: Vec<DrawCommand>,
}

impl Default for Recorder {
    fn default() -> Self {
        Recorder {
            position: Point::ORIGIN,
            heading: 0.0,
            pen_down: true,
            color: Palette::Black.rgb(),
            commands: Vec::new(),
        }
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Current heading in `[0, 360)`.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn is_pen_down(&self) -> bool {
        self.pen_down
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    /// Segments drawn so far, in order.
    pub fn lines(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Line { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
    }

    fn record(&mut self, command: DrawCommand) {
        trace!("turtle: {}", command);
        self.commands.push(command);
    }

    fn set_heading(&mut self, degrees: f64) {
        self.heading = degrees.rem_euclid(360.0);
        self.record(DrawCommand::Heading {
            degrees: self.heading,
        });
    }

    fn move_to(&mut self, to: Point) {
        self.position = to;
        self.record(DrawCommand::MoveTo { to });
    }
}

impl Turtle for Recorder {
    fn pen_up(&mut self) {
        self.pen_down = false;
        self.record(DrawCommand::PenUp);
    }

    fn pen_down(&mut self) {
        self.pen_down = true;
        self.record(DrawCommand::PenDown);
    }

    fn forward(&mut self, distance: f64) {
        let radians = self.heading.to_radians();
        let from = self.position;
        let to = Point::new(
            from.x + distance * radians.cos(),
            from.y + distance * radians.sin(),
        );
        if self.pen_down {
            self.position = to;
            self.record(DrawCommand::Line {
                from,
                to,
                color: self.color,
            });
        } else {
            self.move_to(to);
        }
    }

    fn turn_left(&mut self, degrees: f64) {
        self.set_heading(self.heading + degrees);
    }

    fn turn_right(&mut self, degrees: f64) {
        self.set_heading(self.heading - degrees);
    }

    fn face(&mut self, degrees: f64) {
        self.set_heading(degrees);
    }

    fn jump_to(&mut self, x: f64, y: f64) {
        self.move_to(Point::new(x, y));
    }

    fn home(&mut self) {
        self.move_to(Point::ORIGIN);
        self.set_heading(0.0);
    }

    fn set_color_by_name(&mut self, color: Palette) {
        self.set_color_by_rgb(color.rgb());
    }

    fn set_color_by_rgb(&mut self, rgb: u32) {
        self.color = rgb;
        self.record(DrawCommand::Color { rgb });
    }

    fn x(&self) -> f64 {
        self.position.x
    }

    fn y(&self) -> f64 {
        self.position.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_initial_state() {
        let t = Recorder::new();
        assert_eq!(t.position(), Point::ORIGIN);
        assert_eq!(t.heading(), 0.0);
        assert!(t.is_pen_down());
        assert_eq!(t.color(), 0x000000);
        assert!(t.commands().is_empty());
    }

    #[test]
    fn test_square_returns_to_start() {
        let mut t = Recorder::new();
        for _ in 0..4 {
            t.forward(10.0);
            t.turn_left(90.0);
        }
        assert!(close(t.x(), 0.0) && close(t.y(), 0.0));
        assert_eq!(t.lines().count(), 4);
        let (_, corner) = t.lines().next().unwrap();
        assert!(close(corner.x, 10.0) && close(corner.y, 0.0));
    }

    #[test]
    fn test_heading_is_normalised() {
        let mut t = Recorder::new();
        t.turn_right(90.0);
        assert_eq!(t.heading(), 270.0);
        t.turn_left(450.0);
        assert_eq!(t.heading(), 0.0);
        t.face(-30.0);
        assert_eq!(t.heading(), 330.0);
    }

    #[test]
    fn test_pen_up_moves_without_lines() {
        let mut t = Recorder::new();
        t.pen_up();
        t.face(90.0);
        t.forward(5.0);
        assert_eq!(t.lines().count(), 0);
        assert!(close(t.y(), 5.0));
        t.pen_down();
        t.forward(5.0);
        assert_eq!(t.lines().count(), 1);
    }

    #[test]
    fn test_jump_and_home() {
        let mut t = Recorder::new();
        t.jump_to(3.0, -4.0);
        t.face(45.0);
        assert_eq!((t.x(), t.y()), (3.0, -4.0));
        assert_eq!(t.lines().count(), 0);
        t.home();
        assert_eq!(t.position(), Point::ORIGIN);
        assert_eq!(t.heading(), 0.0);
    }

    #[test]
    fn test_lines_use_current_color() {
        let mut t = Recorder::new();
        t.set_color_by_name(Palette::Orange);
        t.forward(1.0);
        t.set_color_by_rgb(0x0A141E);
        t.forward(1.0);
        let colors: Vec<u32> = t
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(colors, vec![0xFFC800, 0x0A141E]);
    }

    #[test]
    fn test_display() {
        let line = DrawCommand::Line {
            from: Point::ORIGIN,
            to: Point::new(10.0, 0.5),
            color: 0x8000FF,
        };
        assert_eq!(line.to_string(), "line (0, 0) -> (10, 0.5) #8000FF");
        assert_eq!(DrawCommand::Color { rgb: 0xA }.to_string(), "color #00000A");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&DrawCommand::MoveTo {
            to: Point::new(1.0, 2.0),
        })
        .unwrap();
        assert_eq!(json, r#"{"op":"move_to","to":{"x":1.0,"y":2.0}}"#);
        let json = serde_json::to_string(&DrawCommand::PenUp).unwrap();
        assert_eq!(json, r#"{"op":"pen_up"}"#);
    }
}
