//! Navigation executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single navigation command against the kinematic simulator:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the simulated world, robot and planning service
//!     - Run the command through the movement controller
//!     - Archive every velocity command sent and write a JSON report into the session

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use nalgebra::Vector2;
use serde::Serialize;
use std::fs::File;
use structopt::StructOpt;

// Internal
use comms_if::{tc::nav::NavCmd, Stamped};
use nav_lib::{
    goal_decision::{GoalDecision, WaypointQueue},
    loc::Pose2D,
    memory::AvoidanceMemory,
    movement::{GoalRecord, Movement, TickOutcome},
    nav::GoalState,
    params::NavExecParams,
    sim::{self, SentCmd},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(
    name = "nav_exec",
    about = "Run a navigation command against the simulated robot"
)]
struct Opts {
    /// Log at trace level instead of debug
    #[structopt(short, long)]
    verbose: bool,

    /// Parameter file, relative to $NAV_SW_ROOT/params
    #[structopt(long, default_value = "nav_exec.toml")]
    params: String,

    #[structopt(subcommand)]
    cmd: NavCmd,
}

/// One archived velocity command.
#[derive(Debug, Serialize)]
struct CmdRecord {
    index: usize,
    linear_ms: f64,
    angular_rads: f64,
    duration_s: f64,
}

/// Summary of the run, written to `report.json` in the session directory.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    cmd: &'a NavCmd,
    outcome: Outcome,
    final_pose: Pose2D,
    sim_time_s: f64,
    num_cmds: usize,
    memory: AvoidanceMemory,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
enum Outcome {
    Goal(GoalState),
    Ticks(Vec<TickOutcome>),
    Rotated(f64),
    Explored(Vec<GoalRecord>),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    let level = if opts.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(level, &[("nav_lib::sim", LevelFilter::Info)], &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: NavExecParams =
        util::params::load_or_default(&opts.params).wrap_err("Could not load nav_exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE SIMULATION ----

    let (robot, planner) = sim::simulation(&params.sim);
    let frame_id = params.sim.frame_id.clone();
    let mut movement = Movement::new(robot, planner, &params.movement);

    info!("Simulated robot at {:?}", movement.io().pose());

    // ---- RUN COMMAND ----

    info!("Running {:?}", opts.cmd);

    let outcome = match &opts.cmd {
        NavCmd::Goto { x_m, y_m, frame } => {
            let goal = Stamped::now(
                frame.clone().unwrap_or_else(|| frame_id.clone()),
                Vector2::new(*x_m, *y_m),
            );
            let state = movement
                .move_to_goal(&goal)
                .wrap_err("Failed to move to the goal")?;
            Outcome::Goal(state)
        }
        NavCmd::Forward { ticks } => {
            let mut outcomes = Vec::with_capacity(*ticks);
            for _ in 0..*ticks {
                let outcome = movement
                    .move_to_forward()
                    .wrap_err("Forward tick failed")?;
                if let TickOutcome::Skipped(kind) = outcome {
                    warn!("Tick skipped, no {:?} data", kind);
                }
                outcomes.push(outcome);
            }
            Outcome::Ticks(outcomes)
        }
        NavCmd::Rotate { angle_rad } => Outcome::Rotated(
            movement
                .rotate(*angle_rad)
                .wrap_err("Failed to rotate")?,
        ),
        NavCmd::Survey => Outcome::Rotated(
            movement
                .one_rotation()
                .wrap_err("Failed to perform the survey rotation")?,
        ),
        NavCmd::Explore { goals } => {
            let mut queue = WaypointQueue::from_flat(
                params.goal_decision.clone(),
                frame_id.clone(),
                goals,
            );
            if goals.len() % 2 != 0 {
                warn!("Odd number of goal coordinates, the last one is ignored");
            }
            let decision: &mut dyn GoalDecision = &mut queue;
            Outcome::Explored(
                movement
                    .explore(decision, true)
                    .wrap_err("Exploration failed")?,
            )
        }
    };

    // ---- ARCHIVE AND REPORT ----

    let sent: Vec<SentCmd> = movement.io().sent.clone();
    let mut archiver =
        Archiver::from_path(&session, "cmds.csv").wrap_err("Failed to open the command archive")?;
    for (index, s) in sent.iter().enumerate() {
        archiver
            .serialise(CmdRecord {
                index,
                linear_ms: s.linear_ms,
                angular_rads: s.angular_rads,
                duration_s: s.duration_s,
            })
            .wrap_err("Failed to archive a command")?;
    }

    let report = RunReport {
        cmd: &opts.cmd,
        outcome,
        final_pose: movement.io().pose(),
        sim_time_s: movement.io().world().time_s,
        num_cmds: sent.len(),
        memory: *movement.memory(),
    };

    info!(
        "Finished at ({:.2}, {:.2}, {:.1} deg) after {} commands",
        report.final_pose.position_m.x,
        report.final_pose.position_m.y,
        report.final_pose.heading_rad.to_degrees(),
        report.num_cmds
    );

    let report_path = session.session_root.join("report.json");
    serde_json::to_writer_pretty(
        &File::create(&report_path).wrap_err("Failed to create the report file")?,
        &report,
    )
    .wrap_err("Failed to write the report")?;

    info!("Report written to {:?}", report_path);

    Ok(())
}
