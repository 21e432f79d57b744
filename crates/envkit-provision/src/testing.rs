//! Scripted [`CommandRunner`] for unit tests: records every invocation and
//! answers from substring-matched rules.

use std::cell::RefCell;
use std::io;
use std::path::PathBuf;

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

type Responder = Box<dyn Fn(&CommandSpec) -> CommandOutput>;

pub(crate) struct ScriptedRunner {
    rules: Vec<(String, Responder)>,
    path_dirs: Vec<PathBuf>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// `path_dirs` plays the role of `PATH`: `lookup` finds files that exist there.
    pub fn new(path_dirs: Vec<PathBuf>) -> Self {
        Self {
            rules: Vec::new(),
            path_dirs,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Answer commands whose rendered form contains `pattern`. First match wins;
    /// unmatched commands succeed with empty output.
    pub fn on(mut self, pattern: &str, output: CommandOutput) -> Self {
        self.rules
            .push((pattern.to_string(), Box::new(move |_| output.clone())));
        self
    }

    pub fn on_with<F>(mut self, pattern: &str, f: F) -> Self
    where
        F: Fn(&CommandSpec) -> CommandOutput + 'static,
    {
        self.rules.push((pattern.to_string(), Box::new(f)));
        self
    }

    pub fn rendered(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }

    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.rendered().iter().position(|c| c.contains(pattern))
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.rendered().iter().filter(|c| c.contains(pattern)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec) -> io::Result<CommandOutput> {
        self.calls.borrow_mut().push(cmd.clone());
        let rendered = cmd.to_string();
        for (pattern, respond) in &self.rules {
            if rendered.contains(pattern.as_str()) {
                return Ok(respond(cmd));
            }
        }
        Ok(CommandOutput::ok(""))
    }

    fn lookup(&self, binary: &str) -> Option<PathBuf> {
        self.path_dirs
            .iter()
            .map(|d| d.join(binary))
            .find(|p| p.is_file())
    }
}

/// Create an empty file standing in for an installed binary.
pub(crate) fn touch_binary(path: &std::path::Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
}
