//! One-time layout of the distribution: users, directories, files, environment and init unit.

use std::{
    fs, io,
    os::unix::fs::{PermissionsExt as _, chown, symlink},
    path::{Path, PathBuf},
    process::Command,
};

use kafka_charm_common::{
    LineEdit, edit_environment_in_place, is_superuser, openrc, re_edit_in_place, run_checked,
    systemd,
};
use nix::unistd::{Group, User};
use tracing::{debug, info};

use super::{Kafka, LOG4J_PROPERTIES, PRODUCER_PROPERTIES, SERVER_PROPERTIES};
use crate::{
    config::{DirSpec, InitSystem},
    lifecycle::HandlerError,
};

const SERVICE_FILE_TEMPLATE: &str = include_str!("kafka.service.tmpl.ini");
const OPENRC_FILE_TEMPLATE: &str = include_str!("openrc.kafka.tmpl.sh");

const DESCRIPTION: &str = "Apache Kafka broker";

impl Kafka<'_> {
    /// Checks that the distribution resource is unpacked and complete.
    ///
    /// Returns the resource directory.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InstallVerificationFailed`] listing what is missing.
    pub fn verify_resources(&self) -> Result<PathBuf, HandlerError> {
        let resource = self.config.dist.kafka_resource();
        let missing = if resource.is_dir() {
            ["bin", "config"]
                .into_iter()
                .map(|artifact| resource.join(artifact))
                .filter(|path| !path.is_dir())
                .collect::<Vec<_>>()
        } else {
            vec![resource.clone()]
        };
        if missing.is_empty() {
            Ok(resource)
        } else {
            Err(HandlerError::InstallVerificationFailed { missing })
        }
    }

    /// Installs the distribution and its init unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is incomplete, the descriptor lacks the broker port
    /// or unit number, or any filesystem, account or service-manager step fails.
    #[tracing::instrument(skip_all, fields(home = ?self.home()))]
    pub fn install(&self, init_system: InitSystem) -> Result<(), HandlerError> {
        let resource = self.verify_resources()?;
        let port = self.config.dist.kafka_port().map_err(HandlerError::Config)?;
        let broker_id = self.config.unit_number().map_err(HandlerError::Config)?;
        let host = self.advertised_host()?;

        self.add_groups()?;
        self.add_users()?;
        self.add_dirs()?;

        let home = self.home();
        // Left behind as symlinks by an earlier, interrupted install.
        for leftover in ["config", "logs"] {
            remove_path(&home.join(leftover))?;
        }
        copy_tree(&resource, home)?;
        info!(?resource, "Copied distribution");

        self.setup_kafka_config()?;
        self.update_environment()?;

        let data_logs = self.config.dist.dirs.kafka_data_logs.path.display();
        let app_logs = self.config.dist.dirs.kafka_app_logs.path.display();
        re_edit_in_place(
            &self.property_file(SERVER_PROPERTIES),
            &[
                LineEdit::key("broker.id", broker_id)?,
                LineEdit::key("port", port)?,
                LineEdit::key("log.dirs", data_logs)?,
                LineEdit::uncomment_key("advertised.host.name", &host)?,
            ],
        )?;
        re_edit_in_place(
            &self.property_file(PRODUCER_PROPERTIES),
            &[LineEdit::uncomment_key(
                "metadata.broker.list",
                format!("{host}:{port}"),
            )?],
        )?;
        re_edit_in_place(
            &self.property_file(LOG4J_PROPERTIES),
            &[LineEdit::key("kafka.logs.dir", app_logs)?],
        )?;

        self.install_service_unit(init_system)?;
        info!(broker_id, %host, port, "Installed Kafka");
        Ok(())
    }

    fn add_groups(&self) -> Result<(), HandlerError> {
        for group in &self.config.dist.groups {
            if Group::from_name(group)
                .map_err(|e| HandlerError::System(format!("Failed to look up group {group}: {e}")))?
                .is_some()
            {
                debug!(%group, "Group already exists");
                continue;
            }
            require_superuser("create groups")?;
            info!(%group, "Creating group");
            run_checked(Command::new("groupadd").arg("--system").arg(group))
                .map_err(HandlerError::System)?;
        }
        Ok(())
    }

    fn add_users(&self) -> Result<(), HandlerError> {
        for (user, spec) in &self.config.dist.users {
            if User::from_name(user)
                .map_err(|e| HandlerError::System(format!("Failed to look up user {user}: {e}")))?
                .is_some()
            {
                debug!(%user, "User already exists");
                continue;
            }
            require_superuser("create users")?;
            info!(%user, groups = ?spec.groups, "Creating user");
            let mut command = Command::new("useradd");
            command.args(["--system", "--user-group", "--no-create-home"]);
            if !spec.groups.is_empty() {
                command.arg("--groups").arg(spec.groups.join(","));
            }
            run_checked(command.arg(user)).map_err(HandlerError::System)?;
        }
        Ok(())
    }

    fn add_dirs(&self) -> Result<(), HandlerError> {
        for dir in self.config.dist.dirs.all() {
            fs::create_dir_all(&dir.path).map_err(HandlerError::io(&dir.path))?;
            apply_ownership(dir)?;
        }
        Ok(())
    }

    /// Moves the shipped `config/` into the configured conf dir and links it back, since the
    /// broker scripts still look in `KAFKA_HOME/config`. Same for `logs/`.
    fn setup_kafka_config(&self) -> Result<(), HandlerError> {
        let dirs = &self.config.dist.dirs;
        let home = self.home();

        let default_conf = home.join("config");
        remove_path(self.conf_dir())?;
        copy_tree(&default_conf, self.conf_dir())?;
        apply_ownership(&dirs.kafka_conf)?;
        remove_path(&default_conf)?;
        symlink(self.conf_dir(), &default_conf).map_err(HandlerError::io(&default_conf))?;

        let default_logs = home.join("logs");
        remove_path(&default_logs)?;
        symlink(&dirs.kafka_app_logs.path, &default_logs)
            .map_err(HandlerError::io(&default_logs))?;
        Ok(())
    }

    fn update_environment(&self) -> Result<(), HandlerError> {
        let environment_file = &self.config.dist.paths.environment_file;
        let bin = self.home().join("bin");
        let app_logs = &self.config.dist.dirs.kafka_app_logs.path;
        edit_environment_in_place(environment_file, |env| {
            env.append_to_path(&bin.to_string_lossy());
            env.set("LOG_DIR", app_logs.to_string_lossy());
        })
        .map_err(HandlerError::io(environment_file))
    }

    /// The configured `hostname` option, or the machine's short host name.
    fn advertised_host(&self) -> Result<String, HandlerError> {
        if let Some(ref host) = self.config.options.hostname {
            return Ok(host.clone());
        }
        let output = Command::new("hostname")
            .arg("-s")
            .output()
            .map_err(|e| HandlerError::System(format!("Failed to run hostname -s: {e}")))?;
        let host = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if !output.status.success() || host.is_empty() {
            return Err(HandlerError::System(format!(
                "hostname -s failed with {}",
                output.status
            )));
        }
        Ok(host)
    }

    fn render_unit(&self, template: &str) -> String {
        let service = &self.config.dist.service;
        template
            .replace("{ description }", DESCRIPTION)
            .replace("{ name }", &service.name)
            .replace("{ user }", &service.user)
            .replace("{ kafka_conf }", &self.conf_dir().to_string_lossy())
            .replace("{ kafka_bin }", &self.home().join("bin").to_string_lossy())
            .replace(
                "{ kafka_app_logs }",
                &self.config.dist.dirs.kafka_app_logs.path.to_string_lossy(),
            )
    }

    fn install_service_unit(&self, init_system: InitSystem) -> Result<(), HandlerError> {
        let service = &self.config.dist.service;
        match init_system {
            InitSystem::Systemd => {
                let path = systemd::install_service(
                    &service.name,
                    &self.render_unit(SERVICE_FILE_TEMPLATE),
                    &service.systemd_unit_dir,
                )
                .map_err(HandlerError::Service)?;
                systemd::enable(&service.name).map_err(HandlerError::Service)?;
                info!(?path, "Installed systemd unit");
            }
            InitSystem::OpenRc => {
                let path = openrc::install_service(
                    &service.name,
                    &self.render_unit(OPENRC_FILE_TEMPLATE),
                    &service.openrc_init_dir,
                )
                .map_err(HandlerError::Service)?;
                openrc::enable(&service.name).map_err(HandlerError::Service)?;
                info!(?path, "Installed OpenRC script");
            }
            InitSystem::Serviceless | InitSystem::Auto => {
                debug!("Serviceless mode, not installing an init unit");
            }
        }
        Ok(())
    }
}

fn require_superuser(what: &str) -> Result<(), HandlerError> {
    if is_superuser() {
        Ok(())
    } else {
        Err(HandlerError::System(format!("Root privileges are required to {what}")))
    }
}

/// Applies the optional owner (and the owner's primary group) and mode of a directory.
fn apply_ownership(dir: &DirSpec) -> Result<(), HandlerError> {
    if let Some(ref owner) = dir.owner {
        let user = User::from_name(owner)
            .map_err(|e| HandlerError::System(format!("Failed to look up user {owner}: {e}")))?
            .ok_or_else(|| HandlerError::System(format!("User {owner} not found")))?;
        chown(&dir.path, Some(user.uid.into()), Some(user.gid.into()))
            .map_err(HandlerError::io(&dir.path))?;
    }
    if let Some(mode) = dir.mode {
        fs::set_permissions(&dir.path, fs::Permissions::from_mode(mode))
            .map_err(HandlerError::io(&dir.path))?;
    }
    Ok(())
}

/// Removes a file, symlink or directory tree; a missing path is fine.
fn remove_path(path: &Path) -> Result<(), HandlerError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(HandlerError::io(path))
}

/// Recursively copies `src` into `dst`, keeping symlinks as symlinks.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), HandlerError> {
    fs::create_dir_all(dst).map_err(HandlerError::io(dst))?;
    for entry in fs::read_dir(src).map_err(HandlerError::io(src))? {
        let entry = entry.map_err(HandlerError::io(src))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(HandlerError::io(&from))?;
        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&from).map_err(HandlerError::io(&from))?;
            remove_path(&to)?;
            symlink(target, &to).map_err(HandlerError::io(&to))?;
        } else {
            fs::copy(&from, &to).map_err(HandlerError::io(&to))?;
        }
    }
    Ok(())
}
