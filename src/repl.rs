// File: src/repl.rs
//
// Interactive REPL (Read-Eval-Print Loop) for the Toy language.
// Provides an interactive shell for executing Toy code with features like:
// - Multi-line input while braces or parentheses are left open
// - Command history with up/down arrow navigation, optionally persisted
// - Special commands (:help, :quit, :tokens, :ast, :env, :reset, :clear)
// - Persistent state across inputs through a Session

use crate::ast::render_tree;
use crate::config::ReplConfig;
use crate::errors::Phase;
use crate::lexer::render_tokens;
use crate::session::Session;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// REPL that owns a session and a line editor
pub struct Repl {
    session: Session,
    editor: DefaultEditor,
    config: ReplConfig,
}

impl Repl {
    /// Creates a new REPL with a fresh session, loading history if configured
    pub fn new(config: ReplConfig, max_call_depth: usize) -> anyhow::Result<Self> {
        let mut editor = DefaultEditor::new()?;

        if let Some(path) = &config.history_file {
            if path.exists() {
                if let Err(err) = editor.load_history(path) {
                    tracing::warn!(path = %path.display(), %err, "could not load REPL history");
                }
            }
        }

        Ok(Repl { session: Session::with_max_call_depth(max_call_depth), editor, config })
    }

    /// Displays the welcome banner with version and help information
    fn show_banner(&self) {
        println!(
            "{} {}",
            "Toy REPL".bright_cyan().bold(),
            format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
        );
        println!(
            "  {} Use {} for commands or {} to exit",
            "Welcome!".bright_green(),
            ":help".bright_yellow(),
            ":quit".bright_yellow()
        );
        println!("  {} Leave a '{{' open to continue on the next line", "Tip:".bright_magenta());
        println!();
    }

    /// Starts the REPL loop
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.show_banner();

        let mut buffer = String::new();

        loop {
            let prompt = if buffer.is_empty() {
                self.config.prompt.bright_green().to_string()
            } else {
                self.config.continuation.bright_blue().to_string()
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }

                    // Commands are only recognized outside multi-line input
                    if buffer.is_empty() && line.trim().starts_with(':') {
                        if self.handle_command(line.trim()) {
                            continue;
                        }
                        break;
                    }

                    if !buffer.is_empty() {
                        buffer.push('\n');
                    }
                    buffer.push_str(&line);

                    if is_input_complete(&buffer) {
                        self.eval_input(&buffer);
                        buffer.clear();
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C (input discarded, :quit to exit)".bright_yellow());
                    buffer.clear();
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "Goodbye!".bright_cyan());
                    break;
                }
                Err(err) => {
                    self.save_history();
                    return Err(err.into());
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.config.history_file {
            if let Err(err) = self.editor.save_history(path) {
                tracing::warn!(path = %path.display(), %err, "could not save REPL history");
            }
        }
    }

    /// Handles special REPL commands starting with ':'
    /// Returns true to continue REPL, false to quit
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":help" | ":h" => self.show_help(),
            ":quit" | ":q" | ":exit" => {
                println!("{}", "Goodbye!".bright_cyan());
                return false;
            }
            ":clear" | ":c" => {
                print!("\x1B[2J\x1B[1;1H");
                self.show_banner();
            }
            ":tokens" | ":t" => {
                if self.session.last_tokens().is_empty() {
                    println!("  {}", "(no input yet)".dimmed());
                } else {
                    println!("{}", render_tokens(self.session.last_tokens()));
                }
            }
            ":ast" | ":a" => print!("{}", render_tree(self.session.last_statements())),
            ":env" | ":e" => self.show_bindings(),
            ":reset" | ":r" => {
                self.session.reset();
                println!("{}", "✓ Session reset".bright_green());
            }
            _ => {
                println!(
                    "{} Unknown command: {}. Type {} for available commands.",
                    "Error:".bright_red(),
                    cmd.bright_yellow(),
                    ":help".bright_yellow()
                );
            }
        }
        true
    }

    /// Displays help information about available commands
    fn show_help(&self) {
        println!();
        println!("{}", "REPL Commands:".bright_cyan().bold());
        println!("  {}{}  Display this help message", ":help".bright_yellow(), " or :h  ".dimmed());
        println!("  {}{}  Exit the REPL", ":quit".bright_yellow(), " or :q  ".dimmed());
        println!("  {}{}  Tokens of the last input", ":tokens".bright_yellow(), " or :t".dimmed());
        println!("  {}{}  Syntax tree of the last input", ":ast".bright_yellow(), " or :a   ".dimmed());
        println!("  {}{}  Show global bindings", ":env".bright_yellow(), " or :e   ".dimmed());
        println!("  {}{}  Forget everything entered so far", ":reset".bright_yellow(), " or :r ".dimmed());
        println!("  {}{}  Clear the screen", ":clear".bright_yellow(), " or :c ".dimmed());
        println!();
        println!("{}", "Examples:".bright_cyan().bold());
        println!("  {}", "toy> fn greet(name) {".dimmed());
        println!("  {}", "...>     print \"Hello, \" + name;".dimmed());
        println!("  {}", "...> }".dimmed());
        println!("  {}", "toy> greet(\"World\");".dimmed());
        println!();
    }

    /// Displays all bindings in the global frame
    fn show_bindings(&self) {
        let bindings = self.session.global_bindings();
        if bindings.is_empty() {
            println!("  {}", "(no bindings)".dimmed());
            return;
        }
        for (name, value) in bindings {
            println!("  {} = {}", name.bright_yellow(), value.to_string().bright_white());
        }
    }

    /// Submits a complete chunk of input to the session and reports errors
    fn eval_input(&mut self, input: &str) {
        if input.trim().is_empty() {
            return;
        }

        let result = self.session.submit(input);

        // Lex and parse failures commit nothing, so there is nothing new to show
        let committed = match &result {
            Ok(()) => true,
            Err(err) => err.phase() == Phase::RuntimeFailure,
        };
        if committed {
            if self.config.show_tokens {
                println!("{}", render_tokens(self.session.last_tokens()));
            }
            if self.config.show_ast {
                print!("{}", render_tree(self.session.last_statements()));
            }
        }

        if let Err(err) = result {
            eprint!("{}", err.render());
        }
    }
}

/// Returns true once every `{` and `(` outside strings and comments is closed
pub fn is_input_complete(input: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_string {
            match ch {
                _ if escape_next => escape_next = false,
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => {
                // Skip the rest of the line comment
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            _ => {}
        }
    }

    // Over-closed input is complete so the parser can report it
    !in_string && depth <= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_input_is_complete() {
        assert!(is_input_complete("print 1;"));
        assert!(is_input_complete("fn f() { return 1; }"));
        assert!(is_input_complete(""));
    }

    #[test]
    fn test_open_brace_needs_more_input() {
        assert!(!is_input_complete("fn f() {"));
        assert!(!is_input_complete("fn f() {\n  if (x) {\n  }"));
        assert!(!is_input_complete("f(1,"));
    }

    #[test]
    fn test_braces_in_strings_and_comments_are_ignored() {
        assert!(is_input_complete("print \"{\";"));
        assert!(is_input_complete("print 1; // {"));
        assert!(!is_input_complete("print \"unterminated"));
        assert!(is_input_complete("print \"a\\\"{\";"));
    }

    #[test]
    fn test_extra_closing_brace_is_handed_to_parser() {
        assert!(is_input_complete("}"));
    }
}
