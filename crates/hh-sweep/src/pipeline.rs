//! Per-point limit pipeline.
//!
//! Drives the external statistics tools for one output directory: datacard
//! creation, workspace building, asymptotic limits, result collection and
//! the optional pulls, goodness-of-fit and impacts studies, then hands the
//! collected limits to the plotting scripts. Two-dimensional MSSM models go
//! through the asymptotic grid instead.
//!
//! Every stage is a list of [`Invocation`]s with an explicit working
//! directory. Glob patterns are expanded right before the invocation that
//! uses them, since earlier stages create the files they match.

use std::path::{Path, PathBuf};

use hh_core::{Error, LimitType, Result, StatModelDescriptor, ToolsConfig};
use serde::Serialize;

use crate::exec::{CommandRunner, Invocation};
use crate::workdir;

/// Which stages of the pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineMode {
    /// Datacards, workspaces, limits, collection and plots.
    #[default]
    Run,
    /// Collect existing per-job outputs, then plot.
    CollectAndPlot,
    /// Plot only.
    PlotOnly,
}

impl PipelineMode {
    fn run_limits(self) -> bool {
        self == PipelineMode::Run
    }

    fn collect_limits(self) -> bool {
        self != PipelineMode::PlotOnly
    }
}

/// Inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub cfg: PathBuf,
    pub model_desc: String,
    pub output: PathBuf,
    /// Job count forwarded to the external tools.
    pub parallel: usize,
    pub mode: PipelineMode,
    pub impacts: bool,
    pub pulls: bool,
    pub gof: bool,
    pub signal_point: Option<String>,
    pub shapes: Vec<PathBuf>,
    /// Directory relative paths are resolved against.
    pub base_dir: PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cfg: PathBuf::new(),
            model_desc: String::new(),
            output: PathBuf::new(),
            parallel: 8,
            mode: PipelineMode::Run,
            impacts: false,
            pulls: false,
            gof: false,
            signal_point: None,
            shapes: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

const LIMIT_JSON: &str = "limits.json";
const LIMIT_JSON_PATTERN: &str = "limits_*.json";
const GOF_ALGORITHM: &str = "saturated";
const GOF_TOYS: usize = 1100;
const GRID_FILE: &str = "asymptotic_grid.json";
const MSSM_WORKSPACE: &str = "MSSM.root";

#[derive(Serialize)]
struct AsymptoticGrid<'a> {
    opts: &'a str,
    #[serde(rename = "POIs")]
    pois: [&'a str; 2],
    grids: Vec<[String; 3]>,
}

/// Limit pipeline for one descriptor.
pub struct LimitPipeline<'a> {
    desc: &'a StatModelDescriptor,
    tools: &'a ToolsConfig,
    opts: &'a PipelineOptions,
    output: PathBuf,
}

impl<'a> LimitPipeline<'a> {
    pub fn new(
        desc: &'a StatModelDescriptor,
        tools: &'a ToolsConfig,
        opts: &'a PipelineOptions,
    ) -> Result<Self> {
        if opts.parallel == 0 {
            return Err(Error::Validation("--parallel must be at least 1".into()));
        }
        if opts.mode.run_limits() && opts.shapes.is_empty() {
            return Err(Error::Validation("at least one shapes file is required".into()));
        }
        Ok(Self { desc, tools, opts, output: opts.base_dir.join(&opts.output) })
    }

    /// Absolute (or base-relative) output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Run all selected stages.
    pub fn run(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        workdir::ensure_dir(&self.output)?;
        tracing::info!(
            model = %self.desc.name,
            limit_type = %self.desc.limit_type,
            mode = ?self.opts.mode,
            output = %self.output.display(),
            "starting limit pipeline"
        );

        if self.opts.mode.run_limits() {
            self.prepare_datacards(runner)?;
        }
        match self.desc.limit_type {
            LimitType::ModelIndependent | LimitType::Sm | LimitType::NonResonantBsm => {
                self.run_pointwise(runner)
            }
            LimitType::Mssm => self.run_mssm(runner),
        }
    }

    fn in_base(&self, program: &str) -> Invocation {
        Invocation::new(program, self.opts.base_dir.clone())
    }

    fn in_output(&self, program: &str) -> Invocation {
        Invocation::new(program, self.output.clone())
    }

    fn parallel(&self) -> String {
        self.opts.parallel.to_string()
    }

    fn prepare_datacards(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        let shapes = if self.opts.shapes.len() > 1 {
            let merged = format!("{}/shapes.root", self.opts.output.display());
            let hadd = self
                .in_base(&self.tools.hadd)
                .args(["-f9", merged.as_str()])
                .args(self.opts.shapes.iter().map(|p| p.display().to_string()));
            runner.run_checked(&hadd)?;
            merged
        } else {
            self.opts.shapes[0].display().to_string()
        };

        let mut create = self.in_base(&self.tools.create_datacards).args([
            "--cfg".to_string(),
            self.opts.cfg.display().to_string(),
            "--model-desc".to_string(),
            self.opts.model_desc.clone(),
            "--shapes".to_string(),
            shapes,
            "--output".to_string(),
            self.opts.output.display().to_string(),
        ]);
        if let Some(point) = &self.opts.signal_point {
            create = create.args(["--signal-point", point.as_str()]);
        }
        runner.run_checked(&create)
    }

    fn r_max(&self) -> &'static str {
        if self.desc.limit_type == LimitType::Sm { "100" } else { "1" }
    }

    fn run_pointwise(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        let tool = &self.tools.combine_tool;
        if self.opts.mode.run_limits() {
            let t2w = self
                .in_output(tool)
                .args(["-M", "T2W", "-i"])
                .args(workdir::expand_glob(&self.output, "*/*")?)
                .args(["-o", "workspace.root", "--parallel"])
                .arg(self.parallel());
            runner.run_checked(&t2w)?;

            let mut limits = self
                .in_output(tool)
                .args(["-M", "AsymptoticLimits", "-d"])
                .args(workdir::expand_glob(&self.output, "*/*/workspace.root")?)
                .args(["--there", "-n", ".limit", "--parallel"])
                .arg(self.parallel());
            if self.desc.blind {
                limits = limits.args(["--run", "blind"]);
            }
            limits = limits.args(["--rMax", self.r_max()]);
            runner.run_checked(&limits)?;
        }

        if self.opts.mode.collect_limits() {
            let collect = self
                .in_output(tool)
                .args(["-M", "CollectLimits"])
                .args(workdir::expand_glob(&self.output, "*/*/*.limit.*")?)
                .args(["--use-dirs", "-o", LIMIT_JSON]);
            runner.run_checked(&collect)?;
        }

        if self.opts.pulls {
            self.run_pulls(runner)?;
        }
        if self.opts.gof {
            self.run_gof(runner)?;
        }
        if self.opts.impacts {
            self.run_impacts(runner)?;
        }
        self.plot_limits(runner)
    }

    /// `(channel, point)` directories below the output, both levels sorted.
    fn channel_points(&self) -> Result<Vec<(String, Vec<String>)>> {
        workdir::subdirectories(&self.output)?
            .into_iter()
            .map(|ch| {
                let points = workdir::subdirectories(&self.output.join(&ch))?;
                Ok((ch, points))
            })
            .collect()
    }

    fn study_dir(&self, channel: &str, point: &str, name: &str) -> Result<PathBuf> {
        let dir = self.output.join(channel).join(point).join(name);
        workdir::ensure_dir(&dir)?;
        Ok(dir)
    }

    fn run_pulls(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        let diff_nuisances = self.tools.diff_nuisances()?;
        for (channel, points) in self.channel_points()? {
            for point in points {
                let dir = self.study_dir(&channel, &point, "pulls")?;
                let mut fit = Invocation::new(&self.tools.combine, &dir).args([
                    "-M",
                    "MaxLikelihoodFit",
                    "../workspace.root",
                    "--robustFit=1",
                    "--expectSignal=1",
                ]);
                if self.desc.blind {
                    fit = fit.args(["-t", "-1"]);
                }
                runner.run_checked(&fit)?;

                let out = format!("../../../pulls_{channel}_{point}");
                let pulls = Invocation::new(&self.tools.python, &dir)
                    .arg(diff_nuisances.display().to_string())
                    .args(["mlfit.root", "-A", "-a", "-f", "text", "-g"])
                    .arg(format!("{out}.root"))
                    .stdout_to(format!("{out}.txt"));
                runner.run_checked(&pulls)?;
            }
        }
        Ok(())
    }

    fn run_gof(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        let plot_gof = self.tools.plot_gof()?;
        let tool = &self.tools.combine_tool;
        let n = self.opts.parallel;
        let toys_per_job = GOF_TOYS / n;
        for (channel, points) in self.channel_points()? {
            let Some(point) = points.first() else {
                tracing::warn!(channel = %channel, "no signal point directory; skipping goodness of fit");
                continue;
            };
            let dir = self.study_dir(&channel, point, "GoF")?;
            let out = format!("../../../GoF_{channel}_{GOF_ALGORITHM}");
            let out_json = format!("{out}.json");
            let gof = |extra: &[String]| {
                Invocation::new(tool, &dir)
                    .args(["-M", "GoodnessOfFit", "--algorithm", GOF_ALGORITHM])
                    .args(["-d", "../workspace.root", "--fixedSignalStrength=0"])
                    .args(extra.iter().cloned())
            };

            runner.run_checked(&gof(&["-n".into(), format!(".{GOF_ALGORITHM}")]))?;
            runner.run_checked(&gof(&[
                "-n".into(),
                format!(".{GOF_ALGORITHM}.toys"),
                "-t".into(),
                toys_per_job.to_string(),
                "-s".into(),
                format!("0:{}:1", n - 1),
                "--parallel".into(),
                n.to_string(),
            ]))?;

            let toys_pattern = format!("higgsCombine.{GOF_ALGORITHM}.toys.GoodnessOfFit.mH120.*.root");
            let collect = Invocation::new(tool, &dir)
                .args(["-M", "CollectGoodnessOfFit", "--input"])
                .arg(format!("higgsCombine.{GOF_ALGORITHM}.GoodnessOfFit.mH120.root"))
                .args(workdir::expand_glob(&dir, &toys_pattern)?)
                .args(["-o", out_json.as_str()]);
            runner.run_checked(&collect)?;

            let plot = Invocation::new(plot_gof.display().to_string(), &dir)
                .args(["--statistic", GOF_ALGORITHM, "--mass", "120.0", out_json.as_str()])
                .args(["-o", out.as_str(), "--x-min", "0", "--x-max", "250"]);
            runner.run_checked(&plot)?;
        }
        Ok(())
    }

    fn run_impacts(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        let tool = &self.tools.combine_tool;
        let r_max = if self.desc.blind { "100" } else { self.r_max() };
        for (channel, points) in self.channel_points()? {
            for point in points {
                let dir = self.study_dir(&channel, &point, "impacts")?;
                let mut base = Invocation::new(tool, &dir)
                    .args(["-M", "Impacts", "-m", point.as_str(), "-d", "../workspace.root"])
                    .args(["--expectSignal", "10", "--allPars", "--parallel"])
                    .arg(self.parallel());
                if self.desc.blind {
                    base = base.args(["-t", "-1"]);
                }
                base = base.args(["--rMax", r_max]);

                runner.run_checked(&base.clone().arg("--doInitialFit"))?;
                runner.run_checked(&base.args(["--robustFit", "1", "--doFits"]))?;
                let collect = Invocation::new(tool, &dir)
                    .args(["-M", "Impacts", "-m", point.as_str(), "-d", "../workspace.root"])
                    .args(["-o", "impacts.json"]);
                runner.run_checked(&collect)?;

                let plot = Invocation::new(&self.tools.plot_impacts, &dir)
                    .args(["-i", "impacts.json", "-o"])
                    .arg(format!("../../../impacts_{channel}_{point}"));
                runner.run_checked(&plot)?;
            }
        }
        Ok(())
    }

    fn plot_limits(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        let y_title = if self.desc.limit_type == LimitType::Sm {
            "95% CL limit on #sigma / #sigma(SM)"
        } else {
            "95% CL limit on #sigma x BR (pb)"
        };
        let show = if self.desc.blind { "exp" } else { "exp,obs" };

        let mut inputs = workdir::matching(&self.output, LIMIT_JSON_PATTERN)?;
        if self.output.join(LIMIT_JSON).is_file() {
            inputs.push(LIMIT_JSON.to_string());
        }
        if inputs.is_empty() {
            tracing::warn!(output = %self.output.display(), "no collected limits to plot");
        }
        for input in inputs {
            let stem = input.trim_end_matches(".json").to_string();
            let plot = self
                .in_output(&self.tools.plot_limits)
                .args([input.as_str(), "--output", stem.as_str(), "--auto-style"])
                .args(["--y-title", y_title, "--logy", "--show", show]);
            runner.run_checked(&plot)?;
        }
        Ok(())
    }

    fn run_mssm(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        let desc = self.desc;
        let (Some(th_model), Some(grid_x), Some(grid_y), Some(range_x), Some(range_y)) = (
            desc.th_model_file.as_ref(),
            desc.grid_x,
            desc.grid_y,
            desc.draw_range_x,
            desc.draw_range_y,
        ) else {
            return Err(Error::Config(format!(
                "{}: MSSM limits require th_model_file, grid_x, grid_y, draw_range_x, draw_range_y",
                desc.name
            )));
        };
        let th_model_full = self.opts.base_dir.join(th_model);
        let th_dir = th_model_full.parent().map(Path::to_path_buf).unwrap_or_default();
        let th_file = th_model_full
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Config(format!("{}: th_model_file has no file name", desc.name)))?;

        if self.opts.mode.collect_limits() {
            let grid = AsymptoticGrid {
                opts: "--singlePoint 1.0",
                pois: ["mA", "tanb"],
                grids: vec![[grid_x.grid_spec(), grid_y.grid_spec(), String::new()]],
            };
            std::fs::write(self.output.join(GRID_FILE), serde_json::to_string(&grid)?)?;
        }

        let plot_limit_grid = self.tools.plot_limit_grid()?;
        let mut contours = String::from("exp-2,exp-1,exp0,exp+1,exp+2");
        if !desc.blind {
            contours.push_str(",obs");
        }

        for channel in workdir::subdirectories(&self.output)? {
            if self.opts.mode.run_limits() {
                let t2w = self
                    .in_output(&self.tools.combine_tool)
                    .args(["-M", "T2W", "-o", MSSM_WORKSPACE])
                    .args(["-P", "CombineHarvester.CombinePdfs.MSSM:MSSM", "--PO"])
                    .arg(format!("filePrefix={}/", th_dir.display()))
                    .arg("--PO")
                    .arg(format!("modelFiles=13TeV,{th_file},1"))
                    .args(["-i", channel.as_str()]);
                runner.run_checked(&t2w)?;
            }

            let work = self.output.join(&channel).join("work");
            workdir::ensure_dir(&work)?;

            if self.opts.mode.collect_limits() {
                let mut grid = Invocation::new(&self.tools.combine_tool, &work)
                    .args(["-M", "AsymptoticGrid"])
                    .arg(format!("../../{GRID_FILE}"))
                    .arg("-d")
                    .arg(format!("../{MSSM_WORKSPACE}"))
                    .args(["--parallel", self.parallel().as_str(), "--minimizerStrategy=1"]);
                if desc.blind {
                    grid = grid.args(["-t", "-1"]);
                }
                // The first pass submits the grid jobs, the second collects them.
                if self.opts.mode.run_limits() {
                    runner.run_checked(&grid)?;
                }
                runner.run_checked(&grid)?;
            }

            let out = format!("../../limits_{}_{channel}", desc.limit_type);
            let mut draw = Invocation::new(plot_limit_grid.display().to_string(), &work)
                .arg("asymptotic_grid.root")
                .args(["--output", out.as_str(), "--debug-output"])
                .arg(format!("{out}.root"))
                .args(["--contours", contours.as_str()])
                .args(["--cms-sub", desc.label_status.as_str()])
                .args(["--scenario-label", desc.label_scenario.as_str()])
                .args(["--title-right", desc.label_lumi.as_str()])
                .arg("--x-range")
                .arg(format!("{},{}", range_x.min, range_x.max))
                .arg("--y-range")
                .arg(format!("{},{}", range_y.min, range_y.max))
                .args(["--x-title", desc.title_x.as_str(), "--y-title", desc.title_y.as_str()]);
            if desc.draw_mh_exclusion || desc.draw_mh_isolines {
                draw = draw.arg("--model_file").arg(th_model_full.display().to_string());
                if desc.draw_mh_exclusion {
                    draw = draw.arg("--draw_mh_exclusion");
                }
                if desc.draw_mh_isolines {
                    draw = draw
                        .args(["--draw_mH_isolines", "--mH_values"])
                        .arg(desc.signal_points.join(","))
                        .arg("--iso_label_draw_margin")
                        .arg(desc.iso_label_draw_margin.to_string());
                }
            }
            runner.run_checked(&draw)?;
        }
        Ok(())
    }
}
