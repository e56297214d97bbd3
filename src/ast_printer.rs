//! Fully parenthesised prefix rendering of expressions, used by `--emit ast`
//! and by the parser tests: `1 + 2 * 3` prints as `(+ 1 (* 2 3))`.

use std::fmt::Write;

use crate::ast::{Expr, LiteralValue};
use crate::value::format_number;

pub struct AstPrinter {
    buf: String,
}

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        let mut printer = AstPrinter { buf: String::new() };
        printer.expr(expr);
        printer.buf
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(lit) => match lit {
                LiteralValue::Number(n) => self.buf.push_str(&format_number(*n)),
                LiteralValue::Str(s) => self.buf.push_str(s),
                LiteralValue::True => self.buf.push_str("true"),
                LiteralValue::False => self.buf.push_str("false"),
                LiteralValue::Nil => self.buf.push_str("nil"),
            },

            Expr::Grouping(inner) => self.parenthesize("group", &[inner]),

            Expr::Unary {
                operator, right, ..
            } => self.parenthesize(operator.symbol(), &[right]),

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => self.parenthesize(operator.symbol(), &[left, right]),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(operator.symbol(), &[left, right]),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => self.parenthesize("?:", &[condition, then_branch, else_branch]),

            Expr::Variable { name, .. } => self.buf.push_str(&name.lexeme),

            Expr::Assign { name, value, .. } => {
                let _ = write!(self.buf, "(= {} ", name);
                self.expr(value);
                self.buf.push(')');
            }

            Expr::This { .. } => self.buf.push_str("this"),

            Expr::Super { method, .. } => {
                let _ = write!(self.buf, "(super {})", method);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.buf.push_str("(call ");
                self.expr(callee);
                for arg in arguments {
                    self.buf.push(' ');
                    self.expr(arg);
                }
                self.buf.push(')');
            }

            Expr::Get { object, name } => {
                self.buf.push_str("(. ");
                self.expr(object);
                let _ = write!(self.buf, " {})", name);
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                self.buf.push_str("(= (. ");
                self.expr(object);
                let _ = write!(self.buf, " {}) ", name);
                self.expr(value);
                self.buf.push(')');
            }

            // bodies are statements; only the signature is shown
            Expr::Lambda(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
                let _ = write!(self.buf, "(fun ({}) ...)", params.join(" "));
            }
        }
    }

    fn parenthesize(&mut self, name: &str, operands: &[&Box<Expr>]) {
        self.buf.push('(');
        self.buf.push_str(name);
        for operand in operands {
            self.buf.push(' ');
            self.expr(operand);
        }
        self.buf.push(')');
    }
}
