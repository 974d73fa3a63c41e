//! Tree-walking evaluator for the resolved AST.
//!
//! The interpreter owns the global environment (seeded with the native
//! `clock`), tracks the current environment frame, and consumes the
//! resolver's distance table: a reference with a recorded distance walks
//! exactly that many parent links; a reference without one is looked up
//! dynamically in the globals only.
//!
//! Statement execution returns a [`Flow`] — `return` is a control transfer,
//! not an error.  Each statement result is checked so a `Return` unwinds
//! block and loop execution until the nearest call boundary intercepts it;
//! the `LoxError` channel is reserved for genuine runtime faults, which abort
//! the whole run.
//!
//! # Semantics highlights
//!
//! - Truthiness: `nil` and `false` are falsy, everything else is truthy.
//! - Equality: same type and value only, no coercion.
//! - `+` is numeric addition or string concatenation, nothing else.
//! - Division by exactly `0` is a runtime error, not IEEE infinity.
//! - `and`/`or` short-circuit and yield the deciding *operand*, not a bool.
//! - A call builds its frame on the callee's **closure** environment, which
//!   is what makes scoping lexical rather than dynamic.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::parser::{Expr, ExprId, Stmt};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{LoxFunction, Value};

/// Outcome of executing one statement: either control falls through to the
/// next statement, or a `return` is unwinding toward its call boundary.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    locals: Locals,
    output: Box<dyn Write>,
}

impl<'a> Interpreter<'a> {
    /// Creates a new Interpreter printing to stdout, with the native `clock`
    /// pre-defined in the global environment.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an Interpreter writing `print` output to the given sink.
    /// Tests substitute a shared buffer here.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Native {
                name: "clock",
                arity: 0,
                func: |_args: &[Value<'_>]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();

                    Ok(Value::Number(timestamp))
                },
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            output,
        }
    }

    /// Interprets a fully resolved statement list (a "program").  `locals`
    /// must come from a [`Resolver`](crate::resolver::Resolver) pass over the
    /// same parse; entries are merged so a REPL can feed successive lines.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>], locals: Locals) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        self.locals.extend(locals);

        for stmt in statements {
            // Top-level `return` is rejected statically, so a `Return` flow
            // cannot surface here.
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────── statement execution ──────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &'a Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Function { name, params, body } => {
                debug!("Defining function '{}'", name.lexeme);

                // Capture the environment active *now* — the closure.
                let function = LoxFunction {
                    name,
                    params,
                    body,
                    closure: Rc::clone(&self.environment),
                };

                self.environment
                    .borrow_mut()
                    .define(name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                let _ = self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                // The condition is re-evaluated before every iteration.
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Return { keyword: _, value } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }
        }
    }

    /// Executes `statements` with `environment` as the current frame.
    ///
    /// The previous frame is restored before this function returns, whether
    /// the block completed, a `return` unwound it, or a runtime error did.
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut flow = Ok(Flow::Normal);

        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => {}

                other => {
                    flow = other;
                    break;
                }
            }
        }

        self.environment = previous;

        flow
    }

    // ───────────────────────── expression evaluation ─────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                // Short-circuit: the deciding operand itself is the result.
                match operator.token_type {
                    TokenType::OR if left_val.is_truthy() => Ok(left_val),
                    TokenType::AND if !left_val.is_truthy() => Ok(left_val),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        name.lexeme,
                        value.clone(),
                    ),

                    None => self.globals.borrow_mut().assign(name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(LoxError::runtime(
                        name,
                        format!("Undefined variable '{}'.", name.lexeme),
                    ));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee_val, paren, args)
            }
        }
    }

    fn evaluate_unary(&mut self, operator: &'a Token<'a>, right: &'a Expr<'a>) -> Result<Value<'a>> {
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!right_val.is_truthy())),

            _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(LoxError::runtime(operator, "Division by zero."))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
        }
    }

    /// Resolved references walk exactly the recorded number of parent links;
    /// unresolved ones go to the globals, which may legitimately fail.
    fn look_up_variable(&self, name: &'a Token<'a>, id: ExprId) -> Result<Value<'a>> {
        debug!("Looking up variable '{}'", name.lexeme);

        let value = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name.lexeme),

            None => self.globals.borrow().get(name.lexeme),
        };

        value.ok_or_else(|| {
            LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
        })
    }

    // ───────────────────────── calls ─────────────────────────

    /// Invokes a callable (native or user-defined function).
    fn call_value(
        &mut self,
        callee: Value<'a>,
        paren: &'a Token<'a>,
        args: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        match callee {
            Value::Native { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                if args.len() != arity {
                    return Err(LoxError::runtime(
                        paren,
                        format!("Expected {} arguments but got {}.", arity, args.len()),
                    ));
                }

                func(&args).map_err(|msg| LoxError::runtime(paren, msg))
            }

            Value::Function(function) => {
                debug!("Calling function '{}'", function.name.lexeme);

                if args.len() != function.arity() {
                    return Err(LoxError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            function.arity(),
                            args.len()
                        ),
                    ));
                }

                // The frame's parent is the *closure*, not the caller's
                // environment.
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &function.closure,
                ))));

                for (param, arg) in function.params.iter().zip(args) {
                    environment.borrow_mut().define(param.lexeme, arg);
                }

                match self.execute_block(function.body, environment)? {
                    Flow::Return(value) => Ok(value),

                    // Fell off the end of the body.
                    Flow::Normal => Ok(Value::Nil),
                }
            }

            _ => Err(LoxError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// `Write` handle over a shared buffer; lets callers read back everything
/// `print` produced.  Tests pass a clone of one of these as the output sink.
#[derive(Clone, Default)]
pub struct SharedOutput(pub Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
