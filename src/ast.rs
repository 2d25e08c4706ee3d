// File: src/ast.rs
//
// Abstract Syntax Tree (AST) definitions for the Toy language.
// Defines the structure of parsed Toy programs.
//
// Expressions (Expr) evaluate to a value, while Statements (Stmt) are
// executed for effect. Nodes embed the tokens they were parsed from so the
// interpreter can report errors with a line number. The tree is immutable
// once built; function declarations are reference-counted so closures can
// point at them without copying the body.

use crate::lexer::Token;
use std::rc::Rc;

/// Constant values that can appear directly in source code
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
}

/// Represents an expression in Toy - something that evaluates to a value
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    /// `and` / `or`, evaluated with short-circuiting
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        name: Token,
    },
    VariableAssignment {
        name: Token,
        value: Box<Expr>,
    },
    FunctionCall {
        callee: Box<Expr>,
        /// Closing parenthesis, used for the error line
        paren: Token,
        arguments: Vec<Expr>,
    },
    Match {
        keyword: Token,
        subject: Box<Expr>,
        cases: Vec<MatchCase>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: Expr,
    pub body: Expr,
}

/// A named function: parameter list plus a bare statement list
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// Represents a statement in Toy - executed for its effect
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    Print(Expr),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Block(Vec<Stmt>),
    Function(Rc<FunctionDecl>),
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
}

impl Literal {
    fn describe(&self) -> String {
        match self {
            Literal::Number(n) => crate::interpreter::format_number(*n),
            Literal::Str(s) => format!("{:?}", s),
            Literal::Bool(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

/// Renders a program as an indented tree, one node per line.
///
/// ```text
/// Program
///   VarStatement 'a'
///     Literal 1
/// ```
pub fn render_tree(program: &[Stmt]) -> String {
    let mut out = String::from("Program\n");
    for stmt in program {
        write_stmt(&mut out, stmt, 1);
    }
    out
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(text);
    out.push('\n');
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match stmt {
        Stmt::Expression(expr) => {
            push_line(out, depth, "ExpressionStatement");
            write_expr(out, expr, depth + 1);
        }
        Stmt::Var { name, initializer } => {
            push_line(out, depth, &format!("VarStatement '{}'", name.lexeme));
            if let Some(init) = initializer {
                write_expr(out, init, depth + 1);
            }
        }
        Stmt::Print(expr) => {
            push_line(out, depth, "PrintStatement");
            write_expr(out, expr, depth + 1);
        }
        Stmt::If { condition, then_branch, else_branch } => {
            push_line(out, depth, "IfStatement");
            push_line(out, depth + 1, "condition");
            write_expr(out, condition, depth + 2);
            push_line(out, depth + 1, "then");
            write_stmt(out, then_branch, depth + 2);
            if let Some(else_branch) = else_branch {
                push_line(out, depth + 1, "else");
                write_stmt(out, else_branch, depth + 2);
            }
        }
        Stmt::While { condition, body } => {
            push_line(out, depth, "WhileStatement");
            push_line(out, depth + 1, "condition");
            write_expr(out, condition, depth + 2);
            push_line(out, depth + 1, "body");
            write_stmt(out, body, depth + 2);
        }
        Stmt::Block(stmts) => {
            push_line(out, depth, "BlockStatement");
            for s in stmts {
                write_stmt(out, s, depth + 1);
            }
        }
        Stmt::Function(decl) => {
            let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
            push_line(
                out,
                depth,
                &format!("FunctionDeclarationStatement '{}({})'", decl.name.lexeme, params.join(", ")),
            );
            for s in &decl.body {
                write_stmt(out, s, depth + 1);
            }
        }
        Stmt::Return { value, .. } => {
            push_line(out, depth, "ReturnStatement");
            if let Some(value) = value {
                write_expr(out, value, depth + 1);
            }
        }
    }
}

fn write_expr(out: &mut String, expr: &Expr, depth: usize) {
    match expr {
        Expr::Literal(lit) => push_line(out, depth, &format!("Literal {}", lit.describe())),
        Expr::Binary { left, operator, right } => {
            push_line(out, depth, &format!("Binary ({})", operator.lexeme));
            write_expr(out, left, depth + 1);
            write_expr(out, right, depth + 1);
        }
        Expr::Logical { left, operator, right } => {
            push_line(out, depth, &format!("Logical ({})", operator.lexeme));
            write_expr(out, left, depth + 1);
            write_expr(out, right, depth + 1);
        }
        Expr::Unary { operator, right } => {
            push_line(out, depth, &format!("Unary ({})", operator.lexeme));
            write_expr(out, right, depth + 1);
        }
        Expr::Variable { name } => push_line(out, depth, &format!("Variable '{}'", name.lexeme)),
        Expr::VariableAssignment { name, value } => {
            push_line(out, depth, &format!("VariableAssignment '{}'", name.lexeme));
            write_expr(out, value, depth + 1);
        }
        Expr::FunctionCall { callee, arguments, .. } => {
            push_line(out, depth, "FunctionCall");
            write_expr(out, callee, depth + 1);
            for arg in arguments {
                write_expr(out, arg, depth + 1);
            }
        }
        Expr::Match { subject, cases, .. } => {
            push_line(out, depth, "MatchExpression");
            write_expr(out, subject, depth + 1);
            for case in cases {
                push_line(out, depth + 1, "case");
                write_expr(out, &case.pattern, depth + 2);
                push_line(out, depth + 1, "=>");
                write_expr(out, &case.body, depth + 2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn tree(source: &str) -> String {
        render_tree(&parse(&tokenize(source).unwrap()).unwrap())
    }

    #[test]
    fn test_render_simple_program() {
        assert_eq!(
            tree("var a = 1; print a + 2;"),
            "Program
  VarStatement 'a'
    Literal 1
  PrintStatement
    Binary (+)
      Variable 'a'
      Literal 2
"
        );
    }

    #[test]
    fn test_render_nested_statements() {
        let source = r#"
fn pick(n, m) {
    if (n > 0 or !m) return "yes"; else { n = -n; }
    while (n) n = n - 1;
    return match n { case 0 => null, case 1 => true };
}
pick(1, false);
"#;
        assert_eq!(
            tree(source),
            r#"Program
  FunctionDeclarationStatement 'pick(n, m)'
    IfStatement
      condition
        Logical (or)
          Binary (>)
            Variable 'n'
            Literal 0
          Unary (!)
            Variable 'm'
      then
        ReturnStatement
          Literal "yes"
      else
        BlockStatement
          ExpressionStatement
            VariableAssignment 'n'
              Unary (-)
                Variable 'n'
    WhileStatement
      condition
        Variable 'n'
      body
        ExpressionStatement
          VariableAssignment 'n'
            Binary (-)
              Variable 'n'
              Literal 1
    ReturnStatement
      MatchExpression
        Variable 'n'
        case
          Literal 0
        =>
          Literal null
        case
          Literal 1
        =>
          Literal true
  ExpressionStatement
    FunctionCall
      Variable 'pick'
      Literal 1
      Literal false
"#
        );
    }

    #[test]
    fn test_render_empty_program() {
        assert_eq!(render_tree(&[]), "Program\n");
    }
}
