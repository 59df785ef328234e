//! Container lifecycle operations
//!
//! The host exposes no API beyond `vzctl`/`vzlist` text output, so every
//! operation here is: build a command line, run it through the shell
//! channel, and either scrape the output (listings) or hand it to the
//! outcome classifier (state changes). Stop and start deliberately report
//! "already in that state" as an outcome rather than an error, so repeated
//! calls are harmless.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;

use super::password;
use super::VzClient;
use crate::classify::{classify, Operation, Outcome};
use crate::error::{Error, Result};
use crate::models::{Container, ContainerStatus, CreateResult, OsTemplate, Veid};

/// One listing row: veid, process count (`-` when stopped), status word,
/// then the two trailing columns as the listing tool prints them
static LISTING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+)\s+([0-9\-]+)\s+([a-z]+)\s+([0-9\.]+)\s+(\S+)")
        .expect("listing pattern is valid")
});

/// Template tarball names in a directory listing
static TEMPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-z]\S+\.gz)\s").expect("template pattern is valid"));

/// Settings `vzctl create` accepts directly as flags; everything else is
/// applied with `vzctl set` afterwards
const CREATE_FLAGS: [&str; 6] = [
    "diskspace",
    "diskinodes",
    "ostemplate",
    "layout",
    "ipadd",
    "hostname",
];

impl VzClient {
    /// List every container on the node, keyed by veid.
    ///
    /// Zero parsed rows is reported as a parse error: even an idle node
    /// lists its own service containers, so an empty scrape means the
    /// output shape changed, not that the node is empty.
    pub async fn list_containers(&mut self) -> Result<BTreeMap<u32, Container>> {
        let output = self.shell_execute("vzlist -a").await?;
        let mut containers = BTreeMap::new();
        for caps in LISTING_RE.captures_iter(&output) {
            let veid: u32 = match caps[1].parse() {
                Ok(veid) => veid,
                Err(_) => continue,
            };
            let nproc = if &caps[2] == "-" {
                None
            } else {
                caps[2].parse::<u32>().ok()
            };
            let status = caps[3]
                .parse::<ContainerStatus>()
                .unwrap_or(ContainerStatus::Unknown);
            containers.insert(
                veid,
                Container {
                    veid,
                    nproc,
                    status,
                    ip_addr: caps[4].to_string(),
                    hostname: caps[5].to_string(),
                },
            );
        }
        if containers.is_empty() {
            return Err(Error::ParseError {
                context: "container listing",
                output,
            });
        }
        debug!(count = containers.len(), "containers listed");
        Ok(containers)
    }

    /// Whether `veid` appears in the node's container listing
    pub async fn exists(&mut self, veid: Veid) -> Result<bool> {
        let containers = self.list_containers().await?;
        Ok(containers.contains_key(&veid.get()))
    }

    pub(crate) async fn ensure_exists(&mut self, veid: Veid) -> Result<()> {
        if self.exists(veid).await? {
            return Ok(());
        }
        Err(Error::ContainerNotFound {
            veid: veid.get(),
            host: self.host().to_string(),
        })
    }

    /// Look up the IP address(es) assigned to `veid`
    pub async fn veid_to_ip(&mut self, veid: Veid) -> Result<String> {
        let command = format!("vzlist -o ctid,ip | grep {}", veid);
        let output = self.shell_execute(&command).await?;
        let pattern = Regex::new(&format!(r"(?m)^\s*{}\s+(.+?)\s*$", veid))?;
        match pattern.captures(&output) {
            Some(caps) => Ok(caps[1].to_string()),
            None => Err(Error::ContainerNotFound {
                veid: veid.get(),
                host: self.host().to_string(),
            }),
        }
    }

    /// List the OS template tarballs present in the node's cache
    pub async fn list_templates(&mut self) -> Result<Vec<String>> {
        let command = format!(
            "ls -al {}/ | awk '{{print $9}}'",
            self.config().templates.cache_dir.trim_end_matches('/')
        );
        let output = self.shell_execute(&command).await?;
        let templates: Vec<String> = TEMPLATE_RE
            .captures_iter(&output)
            .map(|caps| caps[1].to_string())
            .collect();
        if templates.is_empty() {
            return Err(Error::ParseError {
                context: "template listing",
                output,
            });
        }
        Ok(templates)
    }

    /// Apply `settings` one key at a time via `vzctl set`, returning the
    /// per-key outcome.
    ///
    /// A rejected key never aborts the batch or raises; callers inspect the
    /// map to see which keys took effect.
    pub async fn set_values(
        &mut self,
        veid: Veid,
        settings: &BTreeMap<String, String>,
        save: bool,
    ) -> Result<BTreeMap<String, Outcome>> {
        self.ensure_exists(veid).await?;
        let mut outcomes = BTreeMap::new();
        for (key, value) in settings {
            let mut command = format!("vzctl set {} --{} {}", veid, key, value);
            if save {
                command.push_str(" --save");
            }
            let output = self.shell_execute(&command).await?;
            let outcome = classify(Operation::SetParam, &output);
            if !outcome.is_success() {
                warn!(veid = veid.get(), key = %key, "setting was not applied");
            }
            outcomes.insert(key.clone(), outcome);
        }
        Ok(outcomes)
    }

    /// Stop `veid`, marking it not-to-boot when `save` is set.
    ///
    /// Stopping a stopped (or never-created) container reports
    /// [`Outcome::AlreadyInDesiredState`], never an error.
    pub async fn stop(&mut self, veid: Veid, save: bool) -> Result<Outcome> {
        let mut command = format!("vzctl stop {}", veid);
        if save {
            command.push_str(&format!("; vzctl set {} --onboot no --save", veid));
        }
        let timeout = self.config().timeouts.stop;
        let output = self.execute_with_timeout(&command, timeout).await?;
        let outcome = classify(Operation::Stop, &output);
        info!(veid = veid.get(), outcome = ?outcome.is_success(), "stop completed");
        Ok(outcome)
    }

    /// Start `veid`, marking it to boot with the node when `save` is set.
    /// Starting a running container reports `AlreadyInDesiredState`.
    pub async fn start(&mut self, veid: Veid, save: bool) -> Result<Outcome> {
        let mut command = format!("vzctl start {}", veid);
        if save {
            command.push_str(&format!("; vzctl set {} --onboot yes --save", veid));
        }
        let timeout = self.config().timeouts.start;
        let output = self.execute_with_timeout(&command, timeout).await?;
        let outcome = classify(Operation::Start, &output);
        info!(veid = veid.get(), outcome = ?outcome.is_success(), "start completed");
        Ok(outcome)
    }

    /// Restart an existing container
    pub async fn restart(&mut self, veid: Veid) -> Result<Outcome> {
        self.ensure_exists(veid).await?;
        let command = format!("vzctl restart {}", veid);
        let timeout = self.config().timeouts.restart;
        let output = self.execute_with_timeout(&command, timeout).await?;
        Ok(classify(Operation::Restart, &output))
    }

    /// Create a container and start it.
    ///
    /// The sequence: validate the address, stop any half-configured
    /// remnant under this veid, make sure the OS template is cached
    /// (fetching it once if not), derive a root password and hostname,
    /// merge the mandatory settings over the caller's, then run the whole
    /// creation (create, per-setting set, device-node bootstrap) as one
    /// compound command. A password is generated unless the caller supplied
    /// one that is safe to pass through a shell.
    pub async fn create(
        &mut self,
        veid: Veid,
        ip: &str,
        os_template: &str,
        root_password: Option<&str>,
        settings: BTreeMap<String, String>,
    ) -> Result<CreateResult> {
        if ip.parse::<Ipv4Addr>().is_err() {
            return Err(Error::InvalidAddress {
                address: ip.to_string(),
            });
        }

        // A previous failed create may have left a half-configured
        // container under this veid; stop is harmless when there is none.
        let _ = self.stop(veid, true).await?;
        let template = self.ensure_template(os_template).await?;

        let root_password = match root_password {
            Some(supplied) if password::is_acceptable(supplied) => {
                zeroize::Zeroizing::new(supplied.to_string())
            }
            _ => password::generate(self.config().password_length),
        };

        let local_host = hostname::get()
            .map(|h| h.to_string_lossy().trim().to_string())
            .unwrap_or_else(|_| "localhost".to_string());
        let container_hostname = format!("vps{}.{}", veid, local_host);

        let mut merged = settings;
        merged.insert("ostemplate".to_string(), os_template.to_string());
        merged.insert("layout".to_string(), "simfs".to_string());
        merged.insert("ipadd".to_string(), ip.to_string());
        merged.insert("hostname".to_string(), container_hostname);
        merged.insert("onboot".to_string(), "yes".to_string());

        let mut flags = Vec::new();
        let mut sets = Vec::new();
        for (key, value) in &merged {
            if CREATE_FLAGS.contains(&key.as_str()) {
                flags.push(format!("--{} {}", key, value));
            }
            sets.push(format!("vzctl set {} --{} {} --save", veid, key, value));
        }
        let mut command = format!("vzctl create {} {}", veid, flags.join(" "));
        for set in &sets {
            command.push_str("; ");
            command.push_str(set);
        }
        command.push_str(&format!("; vzctl exec {} mount devpts /dev/pts -t devpts", veid));
        command.push_str(&format!("; vzctl exec {} MAKEDEV tty", veid));
        command.push_str(&format!("; vzctl exec {} MAKEDEV pty", veid));

        let output = self.shell_execute(&command).await?;
        if !classify(Operation::Create, &output).is_success() {
            error!(veid = veid.get(), "container creation failed");
            return Err(Error::CreationFailed {
                veid: veid.get(),
                output,
            });
        }

        let started = self.start(veid, true).await?.is_success();
        info!(veid = veid.get(), template = %template.name, started, "container created");
        Ok(CreateResult {
            veid: veid.get(),
            os_template: template.name,
            ip_addr: ip.to_string(),
            root_password,
            settings: merged,
            started,
        })
    }

    /// Destroy a container's private area for good.
    ///
    /// `confirm` must be set; an unconfirmed call is rejected before any
    /// remote command is sent. The container is stopped first.
    pub async fn destroy(&mut self, veid: Veid, confirm: bool) -> Result<()> {
        if !confirm {
            return Err(Error::Unconfirmed);
        }
        self.ensure_exists(veid).await?;
        let _ = self.stop(veid, true).await?;
        let output = self.shell_execute(&format!("vzctl destroy {}", veid)).await?;
        if !classify(Operation::Destroy, &output).is_success() {
            return Err(Error::CommandFailed {
                operation: "destroy",
                output,
            });
        }
        info!(veid = veid.get(), "container destroyed");
        Ok(())
    }

    /// Run a command inside an existing container and return its output
    pub async fn exec_in(&mut self, veid: Veid, command: &str) -> Result<String> {
        self.ensure_exists(veid).await?;
        self.shell_execute(&format!("vzctl exec {} {}", veid, command))
            .await
    }

    /// Live-migrate an existing container to another node
    pub async fn migrate_live(
        &mut self,
        veid: Veid,
        destination: &str,
        port: u16,
    ) -> Result<String> {
        self.ensure_exists(veid).await?;
        let command = format!(
            "vzmigrate --live {} {} --ssh='-p {}' --nodeps=cpu",
            destination, veid, port
        );
        self.shell_execute(&command).await
    }

    /// Make sure `name` is present in the template cache, fetching it from
    /// the repository once if not. Fails with `TemplateUnavailable` when
    /// the tarball is still absent after the fetch.
    pub async fn ensure_template(&mut self, name: &str) -> Result<OsTemplate> {
        let templates = self.config().templates.clone();
        let mut template = OsTemplate {
            name: name.to_string(),
            present: false,
            source_url: format!(
                "{}/{}.tar.gz",
                templates.repository_url.trim_end_matches('/'),
                name
            ),
        };
        let cache_path = template.cache_path(&templates.cache_dir);

        if self.file_exists(&cache_path).await? {
            template.present = true;
            return Ok(template);
        }

        info!(template = name, url = %template.source_url, "template absent, fetching");
        let fetch = format!(
            "wget {} -O {} -t 5 -T {}",
            template.source_url, cache_path, templates.fetch_timeout
        );
        self.execute_with_timeout(&fetch, templates.fetch_timeout)
            .await?;

        if self.file_exists(&cache_path).await? {
            template.present = true;
            return Ok(template);
        }
        Err(Error::TemplateUnavailable {
            template: name.to_string(),
        })
    }

    /// Probe the remote filesystem for `path`
    pub(crate) async fn file_exists(&mut self, path: &str) -> Result<bool> {
        let command = format!("[[ -e {} ]] && echo true || false", path);
        let output = self.shell_execute(&command).await?;
        // The interactive shell echoes the probe itself, whose literal
        // "echo true" must not satisfy the match.
        let relevant: Vec<&str> = output
            .lines()
            .filter(|line| !line.contains("[[ -e"))
            .collect();
        Ok(classify(Operation::FileExists, &relevant.join("\n")).is_success())
    }
}
