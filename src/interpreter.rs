use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::ast::{AstNode, Kind, Program};
use crate::control::{Control, MAX_SPEED};
use crate::error::RuntimeError;
use crate::tree::{NodeId, Tree};
use crate::turtle::Turtle;

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Drawing speed, 0 to 100. 100 draws without delay; 0 holds still.
    pub speed: u8,
    /// Start paused; the run blocks after its first drawing step until
    /// [`Control::resume`] is called.
    pub pause_on_start: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            speed: MAX_SPEED,
            pause_on_start: false,
        }
    }
}

/// How a run that raised no error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Stopped,
}

/// Why execution is unwinding.
enum Interrupt {
    Stop,
    Fail(RuntimeError),
}

impl From<RuntimeError> for Interrupt {
    fn from(err: RuntimeError) -> Self {
        Interrupt::Fail(err)
    }
}

type Exec = Result<(), Interrupt>;

/// Tree-walking interpreter driving a [`Turtle`].
///
/// Variables live in a global table and, during a procedure call, in one
/// local frame. Lookup tries the active frame and then the globals. An
/// assignment inside a procedure updates the frame if the name is local,
/// otherwise the global if the name is global, and otherwise creates a new
/// local. A procedure body therefore cannot see its caller's locals.
pub struct Interpreter<T: Turtle> {
    turtle: T,
    control: Arc<Control>,
    globals: HashMap<String, f64>,
    frames: Vec<HashMap<String, f64>>,
    procedures: HashMap<String, NodeId>,
}

impl<T: Turtle> Interpreter<T> {
    pub fn new(turtle: T) -> Self {
        Self::with_config(turtle, InterpreterConfig::default())
    }

    pub fn with_config(turtle: T, config: InterpreterConfig) -> Self {
        let control = Control::new(config.speed, config.pause_on_start);
        Self::with_control(turtle, Arc::new(control))
    }

    /// Uses an existing control surface, e.g. one already handed to a UI.
    pub fn with_control(turtle: T, control: Arc<Control>) -> Self {
        Interpreter {
            turtle,
            control,
            globals: HashMap::new(),
            frames: Vec::new(),
            procedures: HashMap::new(),
        }
    }

    /// Handle for pausing, resuming, stopping or re-pacing a run from
    /// another thread.
    pub fn control(&self) -> Arc<Control> {
        Arc::clone(&self.control)
    }

    pub fn turtle(&self) -> &T {
        &self.turtle
    }

    pub fn into_turtle(self) -> T {
        self.turtle
    }

    /// Value of a global variable after (or during) a run.
    pub fn global(&self, name: &str) -> Option<f64> {
        self.globals.get(name).copied()
    }

    pub fn globals(&self) -> &HashMap<String, f64> {
        &self.globals
    }

    /// Runs `program` from a clean variable and procedure state and withdraws
    /// any earlier stop request. The turtle keeps its pose from any previous
    /// run.
    pub fn run(&mut self, program: &Program) -> Result<Completion, RuntimeError> {
        self.control.reset();
        self.globals.clear();
        self.frames.clear();
        self.procedures.clear();

        debug!("run started");
        match self.execute(program.tree(), program.root()) {
            Ok(()) => {
                debug!(globals = self.globals.len(), "run finished");
                Ok(Completion::Finished)
            }
            Err(Interrupt::Stop) => {
                warn!("run stopped on request");
                self.frames.clear();
                Ok(Completion::Stopped)
            }
            Err(Interrupt::Fail(err)) => {
                debug!(error = %err, "run failed");
                self.frames.clear();
                Err(err)
            }
        }
    }

    fn execute(&mut self, tree: &Tree<AstNode>, id: NodeId) -> Exec {
        if self.control.is_stopped() {
            return Err(Interrupt::Stop);
        }
        let node = tree.value(id);
        trace!(node = %node, "visit");

        match node.kind() {
            // Structure
            Kind::Program => {
                let [block, procedures] = operands(tree, id)?;
                self.register_procedures(tree, procedures)?;
                self.execute(tree, block)
            }
            Kind::Block => {
                for &child in tree.children(id) {
                    self.execute(tree, child)?;
                }
                Ok(())
            }

            // Motion
            Kind::Forward => {
                let distance = self.single_argument(tree, id)?;
                self.turtle.forward(distance);
                self.settle()
            }
            Kind::Left => {
                let degrees = self.single_argument(tree, id)?;
                self.turtle.turn_left(degrees);
                self.settle()
            }
            Kind::Right => {
                let degrees = self.single_argument(tree, id)?;
                self.turtle.turn_right(degrees);
                self.settle()
            }
            Kind::Face => {
                let degrees = self.single_argument(tree, id)?;
                self.turtle.face(degrees);
                self.settle()
            }
            Kind::Home => {
                self.turtle.home();
                self.settle()
            }
            Kind::Jump => {
                let [x, y] = operands(tree, id)?;
                let x = self.evaluate(tree, x)?;
                let y = self.evaluate(tree, y)?;
                self.turtle.jump_to(x, y);
                self.settle()
            }

            // Pen & colour
            Kind::PenUp => {
                self.turtle.pen_up();
                self.settle()
            }
            Kind::PenDown => {
                self.turtle.pen_down();
                self.settle()
            }
            Kind::NamedColor(color) => {
                self.turtle.set_color_by_name(color);
                self.settle()
            }
            Kind::Color => {
                let [r, g, b] = operands(tree, id)?;
                let rgb = (self.channel(tree, r)? << 16)
                    | (self.channel(tree, g)? << 8)
                    | self.channel(tree, b)?;
                self.turtle.set_color_by_rgb(rgb);
                self.settle()
            }

            // Statements
            Kind::Set => {
                let [target, expr] = operands(tree, id)?;
                let target = tree.value(target);
                if target.kind() != Kind::Name {
                    return Err(RuntimeError::malformed("set", "target is not a name").into());
                }
                let value = self.evaluate(tree, expr)?;
                self.store(target.text(), value);
                Ok(())
            }
            Kind::Repeat => {
                let [count, body] = operands(tree, id)?;
                // Truncates toward zero; negative and NaN counts saturate to 0.
                let times = self.evaluate(tree, count)? as u64;
                for _ in 0..times {
                    self.execute(tree, body)?;
                }
                Ok(())
            }
            Kind::While => {
                let [condition, body] = operands(tree, id)?;
                loop {
                    if self.control.is_stopped() {
                        return Err(Interrupt::Stop);
                    }
                    if !self.condition(tree, condition)? {
                        return Ok(());
                    }
                    self.execute(tree, body)?;
                }
            }
            Kind::If => match tree.children(id) {
                &[condition, then] => {
                    if self.condition(tree, condition)? {
                        self.execute(tree, then)?;
                    }
                    Ok(())
                }
                &[condition, then, otherwise] => {
                    let branch = if self.condition(tree, condition)? {
                        then
                    } else {
                        otherwise
                    };
                    self.execute(tree, branch)
                }
                other => Err(RuntimeError::malformed(
                    "if",
                    format!("expected 2 or 3 children, found {}", other.len()),
                )
                .into()),
            },
            Kind::Do => self.call_procedure(tree, id),

            Kind::List
            | Kind::Header
            | Kind::Def
            | Kind::Number
            | Kind::Name
            | Kind::GetX
            | Kind::GetY
            | Kind::Add
            | Kind::Sub
            | Kind::Mul
            | Kind::Div
            | Kind::Less
            | Kind::Equal
            | Kind::Greater
            | Kind::Punctuation => Err(RuntimeError::UnknownCommand(node.text().to_string()).into()),
        }
    }

    fn settle(&self) -> Exec {
        if self.control.settle() {
            Ok(())
        } else {
            Err(Interrupt::Stop)
        }
    }

    fn single_argument(&self, tree: &Tree<AstNode>, id: NodeId) -> Result<f64, RuntimeError> {
        let [arg] = operands(tree, id)?;
        self.evaluate(tree, arg)
    }

    /// A colour component, truncated toward zero and checked to be 0..=255.
    fn channel(&self, tree: &Tree<AstNode>, id: NodeId) -> Result<u32, RuntimeError> {
        let value = self.evaluate(tree, id)?;
        let truncated = value.trunc();
        if (0.0..=255.0).contains(&truncated) {
            Ok(truncated as u32)
        } else if value.is_nan() {
            Ok(0)
        } else {
            Err(RuntimeError::ColorOutOfRange(value))
        }
    }

    fn evaluate(&self, tree: &Tree<AstNode>, id: NodeId) -> Result<f64, RuntimeError> {
        let node = tree.value(id);
        let children = tree.children(id);
        match (node.kind(), children) {
            (Kind::Number, []) => parse_number(node.text()),
            (Kind::Name, []) => self.fetch(node.text()),
            (Kind::GetX, []) => Ok(self.turtle.x()),
            (Kind::GetY, []) => Ok(self.turtle.y()),
            (Kind::Add, &[operand]) => self.evaluate(tree, operand),
            (Kind::Sub, &[operand]) => Ok(-self.evaluate(tree, operand)?),
            (Kind::Add, &[lhs, rhs]) => Ok(self.evaluate(tree, lhs)? + self.evaluate(tree, rhs)?),
            (Kind::Sub, &[lhs, rhs]) => Ok(self.evaluate(tree, lhs)? - self.evaluate(tree, rhs)?),
            (Kind::Mul, &[lhs, rhs]) => Ok(self.evaluate(tree, lhs)? * self.evaluate(tree, rhs)?),
            (Kind::Div, &[lhs, rhs]) => {
                let dividend = self.evaluate(tree, lhs)?;
                let divisor = self.evaluate(tree, rhs)?;
                if divisor == 0.0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(dividend / divisor)
            }
            (Kind::Number | Kind::Name | Kind::GetX | Kind::GetY, _) => Err(RuntimeError::malformed(
                node.text(),
                "a value cannot have children",
            )),
            (Kind::Add | Kind::Sub | Kind::Mul | Kind::Div, _) => Err(RuntimeError::malformed(
                node.text(),
                format!("operator with {} operands", children.len()),
            )),
            _ => Err(RuntimeError::malformed(node.text(), "not an expression")),
        }
    }

    fn condition(&self, tree: &Tree<AstNode>, id: NodeId) -> Result<bool, RuntimeError> {
        let node = tree.value(id);
        let compare: fn(f64, f64) -> bool = match node.kind() {
            Kind::Less => |a, b| a < b,
            Kind::Equal => |a, b| a == b,
            Kind::Greater => |a, b| a > b,
            _ => return Err(RuntimeError::malformed(node.text(), "not a comparison")),
        };
        let [lhs, rhs] = operands(tree, id)?;
        Ok(compare(self.evaluate(tree, lhs)?, self.evaluate(tree, rhs)?))
    }

    fn fetch(&self, name: &str) -> Result<f64, RuntimeError> {
        self.frames
            .last()
            .and_then(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    fn store(&mut self, name: &str, value: f64) {
        let target = match self.frames.last_mut() {
            Some(frame) if frame.contains_key(name) || !self.globals.contains_key(name) => frame,
            _ => &mut self.globals,
        };
        trace!(name, value, "store");
        target.insert(name.to_string(), value);
    }

    fn register_procedures(&mut self, tree: &Tree<AstNode>, list: NodeId) -> Result<(), RuntimeError> {
        for &def in tree.children(list) {
            if tree.value(def).kind() != Kind::Def {
                return Err(RuntimeError::malformed(
                    tree.value(def).text(),
                    "expected a procedure definition",
                ));
            }
            let [header, _body] = operands(tree, def)?;
            let [name, _params] = operands(tree, header)?;
            let name = tree.value(name).text();
            debug!(procedure = name, "registered");
            self.procedures.insert(name.to_string(), def);
        }
        Ok(())
    }

    fn call_procedure(&mut self, tree: &Tree<AstNode>, id: NodeId) -> Exec {
        let [name, args] = operands(tree, id)?;
        let name = tree.value(name).text();
        let def = *self
            .procedures
            .get(name)
            .ok_or_else(|| RuntimeError::UndefinedProcedure(name.to_string()))?;
        let [header, body] = operands(tree, def)?;
        let [_, params] = operands(tree, header)?;

        let formals = tree.children(params);
        let actuals = tree.children(args);
        if formals.len() != actuals.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: formals.len(),
                found: actuals.len(),
            }
            .into());
        }

        let mut frame = HashMap::with_capacity(formals.len());
        for (&formal, &actual) in formals.iter().zip(actuals) {
            let value = self.evaluate(tree, actual)?;
            frame.insert(tree.value(formal).text().to_string(), value);
        }

        debug!(procedure = name, depth = self.frames.len() + 1, "call");
        self.frames.push(frame);
        let result = self.execute(tree, body);
        self.frames.pop();
        result
    }
}

/// The children of `id`, which must number exactly `N`.
fn operands<const N: usize>(tree: &Tree<AstNode>, id: NodeId) -> Result<[NodeId; N], RuntimeError> {
    let children = tree.children(id);
    <[NodeId; N]>::try_from(children).map_err(|_| {
        RuntimeError::malformed(
            tree.value(id).text(),
            format!("expected {N} children, found {}", children.len()),
        )
    })
}

/// Reads a NUMBER literal, ignoring a precision suffix.
fn parse_number(text: &str) -> Result<f64, RuntimeError> {
    text.trim_end_matches(['f', 'F', 'd', 'D'])
        .parse()
        .map_err(|_| RuntimeError::InvalidNumber(text.to_string()))
}
