//! Test doubles for the I/O boundary traits

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

use stackup::infrastructure::traits::{CommandRunner, Prompter, SelectionItem, Selector};

pub fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

pub fn output(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

fn key(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Command runner answering from a table of `"program arg arg"` → output.
///
/// Unknown commands behave like a missing binary (`NotFound`).
#[derive(Default)]
pub struct MockCommandRunner {
    responses: HashMap<String, Output>,
    attached_code: i32,
    calls: Mutex<Vec<String>>,
    attached: Mutex<Vec<String>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, cmdline: &str, code: i32, stdout: &str) -> Self {
        self.responses
            .insert(cmdline.to_string(), output(code, stdout, ""));
        self
    }

    pub fn respond_err(mut self, cmdline: &str, code: i32, stderr: &str) -> Self {
        self.responses
            .insert(cmdline.to_string(), output(code, "", stderr));
        self
    }

    /// Exit code of every attached (compose lifecycle) run.
    pub fn attached_exit(mut self, code: i32) -> Self {
        self.attached_code = code;
        self
    }

    /// Working docker with compose plugin 2.24.5 and a reachable daemon.
    pub fn docker() -> Self {
        Self::new()
            .respond("docker --version", 0, "Docker version 25.0.3, build 4debf41")
            .respond("docker compose version", 0, "Docker Compose version v2.24.5")
            .respond("docker info", 0, "Server Version: 25.0.3")
    }

    /// Working podman with podman-compose 1.0.6 and a running machine.
    pub fn podman() -> Self {
        Self::new()
            .respond("podman --version", 0, "podman version 4.9.3")
            .respond("podman-compose version", 0, "podman-compose version 1.0.6\npodman version 4.9.3")
            .respond("podman info", 0, "host:\n  arch: amd64")
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attached_calls(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let k = key(cmd, args);
        self.calls.lock().unwrap().push(k.clone());
        self.responses
            .get(&k)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{cmd}: not found")))
    }

    fn run_attached(&self, cmd: &str, args: &[&str]) -> io::Result<ExitStatus> {
        self.attached.lock().unwrap().push(key(cmd, args));
        Ok(exit_status(self.attached_code))
    }
}

/// Prompter replaying scripted answers; records every prompt shown.
///
/// Exhausted inputs behave like end of input, exhausted confirms return the default.
#[derive(Default)]
pub struct ScriptedPrompter {
    inputs: Mutex<VecDeque<Option<String>>>,
    confirms: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(self, answers: &[&str]) -> Self {
        self.inputs
            .lock()
            .unwrap()
            .extend(answers.iter().map(|a| Some(a.to_string())));
        self
    }

    pub fn confirms(self, answers: &[bool]) -> Self {
        self.confirms.lock().unwrap().extend(answers.iter().copied());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.inputs.lock().unwrap().pop_front().flatten())
    }

    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(default))
    }
}

/// Selector choosing items by value; `None` simulates Esc.
#[derive(Default)]
pub struct ScriptedSelector {
    picks: Mutex<VecDeque<Option<String>>>,
    shown: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSelector {
    pub fn new(picks: &[Option<&str>]) -> Self {
        Self {
            picks: Mutex::new(picks.iter().map(|p| p.map(str::to_string)).collect()),
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Values offered per selection, in display order.
    pub fn shown(&self) -> Vec<Vec<String>> {
        self.shown.lock().unwrap().clone()
    }
}

impl Selector for ScriptedSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        _prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        self.shown
            .lock()
            .unwrap()
            .push(items.iter().map(|i| i.value.clone()).collect());
        let pick = self
            .picks
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "no scripted selection left".to_string())?;
        Ok(pick.and_then(|value| items.iter().find(|i| i.value == value).cloned()))
    }
}
