//! Scripted in-process transport for testing
//!
//! [`MockHost`] plays the remote side of the sentinel protocol: every line
//! written to a stream is echoed back (as an interactive shell would),
//! answered from a substring-matched script, and terminated with the
//! sentinel. Lines written without the protocol suffix get their reply with
//! no sentinel, and a command can be scripted to swallow its completion so
//! timeout paths can be exercised.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vzremote::channel::SENTINEL;
use vzremote::error::Result;
use vzremote::{RemoteSession, RemoteStream};

/// One scripted response
#[derive(Clone)]
enum Reply {
    /// Reply text followed by the completion marker
    Text(String),
    /// Partial output with the completion marker withheld
    Swallow(String),
}

struct Rule {
    needle: String,
    replies: VecDeque<Reply>,
}

struct HostState {
    rules: Vec<Rule>,
    executed: Vec<String>,
    connected: bool,
    shells_opened: usize,
}

impl HostState {
    /// First matching rule wins; a multi-reply rule is consumed in order
    /// and its last reply repeats.
    fn reply_for(&mut self, command: &str) -> Reply {
        for rule in &mut self.rules {
            if command.contains(&rule.needle) {
                let reply = if rule.replies.len() > 1 {
                    rule.replies.pop_front()
                } else {
                    rule.replies.front().cloned()
                };
                return reply.unwrap_or_else(|| Reply::Text(String::new()));
            }
        }
        Reply::Text(String::new())
    }
}

/// A scripted remote host shared by a session and its streams
#[derive(Clone)]
pub struct MockHost {
    state: Arc<Mutex<HostState>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                rules: Vec::new(),
                executed: Vec::new(),
                connected: true,
                shells_opened: 0,
            })),
        }
    }

    /// Script a reply for every command containing `needle`
    pub fn respond(&self, needle: &str, reply: &str) {
        self.state.lock().unwrap().rules.push(Rule {
            needle: needle.to_string(),
            replies: VecDeque::from([Reply::Text(reply.to_string())]),
        });
    }

    /// Script a sequence of replies; the last one repeats
    pub fn respond_seq(&self, needle: &str, replies: &[&str]) {
        self.state.lock().unwrap().rules.push(Rule {
            needle: needle.to_string(),
            replies: replies.iter().map(|r| Reply::Text(r.to_string())).collect(),
        });
    }

    /// Script a command to emit `partial` output and never complete
    pub fn swallow(&self, needle: &str, partial: &str) {
        self.state.lock().unwrap().rules.push(Rule {
            needle: needle.to_string(),
            replies: VecDeque::from([Reply::Swallow(partial.to_string())]),
        });
    }

    /// Drop the connection out from under the client
    pub fn sever(&self) {
        self.state.lock().unwrap().connected = false;
    }

    /// Commands received so far, with the protocol suffix stripped
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    /// How many shell streams have been opened
    pub fn shells_opened(&self) -> usize {
        self.state.lock().unwrap().shells_opened
    }

    pub fn session(&self) -> Arc<dyn RemoteSession> {
        Arc::new(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

struct MockSession {
    state: Arc<Mutex<HostState>>,
}

#[async_trait]
impl RemoteSession for MockSession {
    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn fingerprint(&self) -> Option<String> {
        Some("SHA256:mockmockmock".to_string())
    }

    async fn open_shell(&self) -> Result<Box<dyn RemoteStream>> {
        self.state.lock().unwrap().shells_opened += 1;
        Ok(Box::new(MockStream {
            state: Arc::clone(&self.state),
            pending: VecDeque::new(),
            closed: false,
        }))
    }

    async fn open_exec(&self, command: &str) -> Result<Box<dyn RemoteStream>> {
        let mut stream = MockStream {
            state: Arc::clone(&self.state),
            pending: VecDeque::new(),
            closed: false,
        };
        stream.accept_line(command, false);
        Ok(Box::new(stream))
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().connected = false;
        Ok(())
    }
}

struct MockStream {
    state: Arc<Mutex<HostState>>,
    pending: VecDeque<u8>,
    closed: bool,
}

impl MockStream {
    /// Process one line as the remote shell would: record it, echo it (for
    /// interactive streams), and queue the scripted reply. The sentinel is
    /// appended only when the line carried the protocol suffix and the
    /// script did not swallow it.
    fn accept_line(&mut self, line: &str, echo: bool) {
        let suffix = format!("; echo \"{}\"", SENTINEL);
        let (command, framed) = match line.strip_suffix(&suffix) {
            Some(command) => (command.to_string(), true),
            None => (line.to_string(), false),
        };
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.executed.push(command.clone());
            state.reply_for(&command)
        };
        if echo {
            self.push_text(&format!("{}\r\n", line));
        }
        match reply {
            Reply::Text(text) => {
                if !text.is_empty() {
                    self.push_text(&format!("{}\r\n", text));
                }
                if framed {
                    self.push_text(&format!("{}\r\n", SENTINEL));
                }
            }
            Reply::Swallow(partial) => {
                if !partial.is_empty() {
                    self.push_text(&format!("{}\r\n", partial));
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        self.pending.extend(text.as_bytes());
    }
}

#[async_trait]
impl RemoteStream for MockStream {
    async fn read_chunk(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if self.closed || self.pending.is_empty() {
            // Let other tasks run; a real stream would block here.
            tokio::task::yield_now().await;
            return Ok(Vec::new());
        }
        let take = self.pending.len().min(max_len);
        Ok(self.pending.drain(..take).collect())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data).into_owned();
        for line in text.split('\n').filter(|l| !l.trim().is_empty()) {
            self.accept_line(line.trim_end_matches('\r'), true);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
