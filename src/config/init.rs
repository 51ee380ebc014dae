// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a commented keel.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const DEFAULT_DEPLOY_TO: &str = "/srv/my-app";
const DEFAULT_REPOSITORY: &str = "git@example.com:me/my-app.git";

/// Write `keel.yml` into `dir`. Returns the path written.
pub fn init_config(
    dir: &Path,
    deploy_to: Option<&str>,
    repository: Option<&str>,
    force: bool,
) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(
        deploy_to.unwrap_or(DEFAULT_DEPLOY_TO),
        repository.unwrap_or(DEFAULT_REPOSITORY),
    );
    std::fs::write(&config_path, yaml)?;

    Ok(config_path)
}

fn generate_template_yaml(deploy_to: &str, repository: &str) -> String {
    format!(
        r#"deploy_to: {deploy_to}
source:
  git: {repository}
  # directory: /path/to/build/output

# revision: main             # also names the release; timestamp when unset
# keep_releases: 5
# user: deploy
# group: deploy

# symlinks:                  # shared path -> release path
#   system: public/system
#   pids: tmp/pids
#   log: log

# migrate: true
# migration_command: bundle exec rake db:migrate

# restart: touch tmp/restart.txt

# hooks:
#   before_migrate: deploy/before_migrate.rb
#   after_restart:
#     script: puts "deployed"

# environment:
#   RAILS_ENV: production
#   SECRET_KEY_BASE: {{ env: SECRET_KEY_BASE }}

# dependencies:
#   manifest: Gemfile
#   command: bundle install --deployment
"#
    )
}
