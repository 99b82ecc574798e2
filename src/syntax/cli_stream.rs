use rustyline::error::ReadlineError;
use rustyline::Editor;

use super::ast::Expression;
use super::parser::Parser;
use super::tokenizer::Tokenizer;
use crate::error::Error;


/// Reads statements from an interactive terminal.
///
/// Lines are accumulated until every bracket and string opened so far is
/// closed; the collected tokens are then parsed as one sequence.
pub struct CliStream {
    editor: Editor<()>,
    tokenizer: Tokenizer,

    curr_input: String,
}

impl CliStream {
    pub fn new() -> CliStream {
        CliStream {
            editor: Editor::<()>::new(),
            tokenizer: Tokenizer::new(),

            curr_input: String::default(),
        }
    }

    fn parse_pending(&mut self) -> Result<Vec<Expression>, Error> {
        self.tokenizer.finish()?;
        let tokens = self.tokenizer.by_ref().collect::<Vec<_>>();
        Ok(Parser::new(tokens).parse_all()?)
    }
}

impl Default for CliStream {
    fn default() -> Self {
        Self::new()
    }
}


impl Iterator for CliStream {
    type Item = Result<Vec<Expression>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = if self.tokenizer.depth() == 0 {
                self.editor.readline("> ")
            } else {
                self.editor
                    .readline(&format!("..{}", "  ".repeat(self.tokenizer.depth())))
            };

            match line {
                Ok(line) => {
                    if !self.curr_input.is_empty() {
                        self.curr_input.push('\n');
                    }
                    self.curr_input += &line;
                    if let Err(err) = self.tokenizer.tokenize(&line) {
                        println!("{}", err);
                        println!();
                        self.tokenizer.clear();
                        self.curr_input.clear();
                        continue;
                    }
                    if self.tokenizer.depth() > 0 {
                        continue;
                    }

                    self.editor.add_history_entry(self.curr_input.as_str());
                    self.curr_input.clear();
                    let parsed = self.parse_pending();
                    self.tokenizer.clear();
                    match parsed {
                        Ok(statements) if statements.is_empty() => continue,
                        result => return Some(result),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    self.curr_input.clear();
                    if self.tokenizer.depth() > 0 {
                        // Enable ^C to cancel a statement mid-input.
                        self.tokenizer.clear();
                    }
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("^D");
                    self.tokenizer.clear();
                    return None;
                }
                Err(err) => {
                    println!("[Readline Error]: {:?}", err);
                    println!();
                    self.tokenizer.clear();
                    self.curr_input.clear();
                    continue;
                }
            }
        }
    }
}
