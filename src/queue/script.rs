use std::path::Path;

use log::info;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::cluster::ResolvedConfig;
use crate::queue::Backend;

/// A rendered batch script, ready to be written to `jobscript.sh`
///
/// When the scheduler runs it, the script:
/// - writes `RUNNING` to the status file (SLURM only)
/// - sources the virtual environment activation script (`/dev/null` if none was configured)
/// - changes into the working directory and sets `OMP_NUM_THREADS`
/// - launches `mpiproc` copies of `run` with `mpirun` or `srun`, output going to the job log
/// - writes `FINISHED` or `CRASHED` to the status file depending on the exit code
/// - moves the working directory to the final directory, only if a temporary directory is in use
///   and the run succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScript {
    pub content: String,
}

/// Rendering context shared by both templates
///
/// Every placeholder in `data/templates/` must name a field here, otherwise rendering panics.
/// Path fields are already shell-escaped and go into the script unquoted.
#[derive(Serialize)]
struct ScriptContext {
    name: String,
    nodes: u32,
    time: String,
    ppn: u32,
    queue: String,
    ompnum: u32,
    pernode: u32,
    mpiproc: u64,
    account: Option<String>,
    mem: Option<String>,
    venv: String,
    workdir: String,
    finaldir: String,
    finaldir_parent: String,
    usetemp: bool,
    scriptpath: String,
    jobdir: String,
    logpath: String,
    configpath: String,
    statuspath: String,
}

impl From<&ResolvedConfig> for ScriptContext {
    fn from(config: &ResolvedConfig) -> Self {
        ScriptContext {
            name: config.name.clone(),
            nodes: config.nodes,
            time: config.time.clone(),
            ppn: config.ppn,
            queue: config.queue.clone(),
            ompnum: config.ompnum,
            pernode: config.pernode,
            mpiproc: config.mpiproc,
            account: config.account.clone(),
            mem: config.mem.clone(),
            venv: display(&config.venv),
            workdir: display(&config.workdir),
            finaldir: display(&config.finaldir),
            finaldir_parent: display(config.finaldir.parent().unwrap_or(Path::new("/"))),
            usetemp: config.usetemp,
            scriptpath: display(&config.scriptpath),
            jobdir: display(&config.jobdir),
            logpath: display(&config.logpath),
            configpath: display(&config.configpath),
            statuspath: display(&config.statuspath),
        }
    }
}

fn display(path: &Path) -> String {
    shell_escape(&path.display().to_string())
}

/// POSIX single-quote escaping, so `$`, `"` and spaces left in a path reach the job untouched
fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:@+,=".contains(c)) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Render the backend's template using TinyTemplate
///
/// Templates are compiled into the binary, so a template error or a placeholder without a field
/// in the context is a bug, not a user error.
pub fn render(backend: &Backend, config: &ResolvedConfig) -> JobScript {
    let name = backend.queue_sys.to_string();
    let mut tt = TinyTemplate::new();
    // shell scripts, not HTML
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template(&name, backend.template).expect("Template");

    info!("Rendering {} job script for {}", name, config.name);
    let context = ScriptContext::from(config);
    JobScript { content: tt.render(&name, &context).expect("Rendered job script") }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::queue::QueueSystem;

    fn config(queue_sys: QueueSystem) -> ResolvedConfig {
        let jobdir = PathBuf::from("/abs/out/job");
        ResolvedConfig {
            name: "job".to_string(),
            nodes: 2,
            time: "01:00:00".to_string(),
            directory: PathBuf::from("/abs/out"),
            temp_directory: PathBuf::from("/abs/out"),
            system: None,
            queue_sys,
            ppn: 8,
            queue: "batch".to_string(),
            ompnum: 4,
            pernode: 1,
            account: None,
            mem: None,
            venv: PathBuf::from("/dev/null"),
            mpiproc: 2,
            workdir: PathBuf::from("/abs/out"),
            finaldir: PathBuf::from("/abs/out"),
            usetemp: false,
            scriptpath: PathBuf::from("/opt/bin/pipeline-queue"),
            logpath: jobdir.join("jobout.log"),
            configpath: jobdir.join("config.yaml"),
            statuspath: jobdir.join("STATUS"),
            jobdir,
        }
    }

    fn with_temp(mut config: ResolvedConfig) -> ResolvedConfig {
        config.workdir = PathBuf::from("/scratch/tmp");
        config.temp_directory = config.workdir.clone();
        config.jobdir = config.workdir.join("job");
        config.logpath = config.jobdir.join("jobout.log");
        config.configpath = config.jobdir.join("config.yaml");
        config.statuspath = config.jobdir.join("STATUS");
        config.usetemp = true;
        config
    }

    fn render_for(config: &ResolvedConfig) -> String {
        render(&config.queue_sys.backend(), config).content
    }

    #[test]
    fn pbs_directives_and_launch() {
        let script = render_for(&config(QueueSystem::Pbs));

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("#PBS -l nodes=2:ppn=8\n"));
        assert!(script.contains("#PBS -q batch\n"));
        assert!(script.contains("#PBS -l walltime=01:00:00\n"));
        assert!(script.contains("export OMP_NUM_THREADS=4\n"));
        assert!(script.contains(
            "mpirun -np 2 -npernode 1 -bind-to none /opt/bin/pipeline-queue run /abs/out/job/config.yaml &> /abs/out/job/jobout.log"
        ));
        assert!(script.contains("source /dev/null\n"));
        assert!(script.contains("cd /abs/out\n"));
        assert!(!script.contains("#PBS -A"));
    }

    #[test]
    fn pbs_never_writes_running() {
        let script = render_for(&config(QueueSystem::Pbs));
        assert!(!script.contains("RUNNING"));
        assert!(script.contains("echo FINISHED > /abs/out/job/STATUS"));
        assert!(script.contains("echo CRASHED > /abs/out/job/STATUS"));
    }

    #[test]
    fn slurm_directives_and_launch() {
        let mut config = config(QueueSystem::Slurm);
        config.account = Some("rpp-krs".to_string());
        config.mem = Some("0".to_string());
        let script = render_for(&config);

        assert!(script.contains("#SBATCH --account=rpp-krs\n"));
        assert!(script.contains("#SBATCH --nodes=2\n"));
        assert!(script.contains("#SBATCH --ntasks-per-node=1\n"));
        assert!(script.contains("#SBATCH --cpus-per-task=4\n"));
        assert!(script.contains("#SBATCH --mem=0\n"));
        assert!(script.contains("#SBATCH --time=01:00:00\n"));
        assert!(script.contains("export OMP_NUM_THREADS=$SLURM_CPUS_PER_TASK\n"));
        assert!(script.contains("srun --ntasks=2 --ntasks-per-node=1 "));
    }

    #[test]
    fn slurm_marks_running_before_launch() {
        let script = render_for(&config(QueueSystem::Slurm));
        let running = script.find("echo RUNNING > /abs/out/job/STATUS").unwrap();
        let launch = script.find("srun ").unwrap();
        let finished = script.find("echo FINISHED").unwrap();
        assert!(running < launch && launch < finished);
    }

    #[test]
    fn slurm_omits_unset_optional_directives() {
        let script = render_for(&config(QueueSystem::Slurm));
        assert!(!script.contains("--account"));
        assert!(!script.contains("--mem"));
        assert!(script.starts_with("#!/bin/bash\n#SBATCH --nodes=2\n"));
    }

    #[test]
    fn no_relocation_without_temp_directory() {
        for queue_sys in [QueueSystem::Pbs, QueueSystem::Slurm] {
            let script = render_for(&config(queue_sys));
            assert!(!script.contains("mv "));
            assert!(!script.contains("mkdir"));
        }
    }

    #[test]
    fn relocation_only_on_success() {
        for queue_sys in [QueueSystem::Pbs, QueueSystem::Slurm] {
            let script = render_for(&with_temp(config(queue_sys)));
            assert!(script.contains(
                "if [ $exit_code -eq 0 ]; then\n    mkdir -p /abs\n    mv /scratch/tmp /abs/out\nfi"
            ));
            assert!(script.contains("cd /scratch/tmp\n"));
            // status lands in the working directory and travels with it
            assert!(script.contains("echo FINISHED > /scratch/tmp/job/STATUS"));
        }
    }

    #[test]
    fn shell_escape_quotes_only_when_needed() {
        assert_eq!(shell_escape("/abs/out-1/job_2"), "/abs/out-1/job_2");
        assert_eq!(shell_escape("/abs/my dir"), "'/abs/my dir'");
        assert_eq!(shell_escape("/abs/$UNSET/out"), "'/abs/$UNSET/out'");
        assert_eq!(shell_escape("/abs/it's"), "'/abs/it'\\''s'");
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn dollar_in_path_is_not_expanded_by_the_job() {
        let mut config = config(QueueSystem::Slurm);
        config.workdir = PathBuf::from("/abs/$UNSET/out");
        let script = render_for(&config);
        assert!(script.contains("cd '/abs/$UNSET/out'\n"));
    }

    #[test]
    fn paths_are_not_html_escaped() {
        let mut config = config(QueueSystem::Pbs);
        config.name = "a&b<c>".to_string();
        let script = render_for(&config);
        assert!(script.contains("#PBS -N a&b<c>\n"));
        assert!(script.contains("&> /abs/out/job/jobout.log"));
    }
}
