//! Main navigation executable entry point.
//!
//! # Architecture
//!
//! The executable runs three threads:
//!
//!     - The simulated driver, publishing robot state, scans and bump events
//!       into the sensor feed and accepting velocity commands.
//!     - Motion control, which picks a behaviour each cycle and commands the
//!       robot.
//!     - Fusion, which owns the pose estimator and publishes pose telemetry.
//!
//! The two core tasks share nothing but the feed and the shutdown flag. A
//! Ctrl-C or a lost connection stops both, the robot is sent a zero command
//! and the process exits.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{error, info};
use std::thread;
use std::time::Duration;

// Internal
use nav_lib::{
    feat_ext::{self, FeatExt},
    fusion::{self, FusionError, FusionLoop},
    mov_ctrl::{MovCtrl, MovCtrlError, MovCtrlTask},
    params::NavExecParams,
    pose_est,
    shutdown::Shutdown,
    sim::{self, SimDriver},
    tm_sink::{ArchiveTmSink, LogTmSink},
};
use robot_if::feed::SensorFeed;
use util::{
    logger::{level_from_str, logger_init},
    module::State,
    params,
    session::Session,
    time::SystemClock,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let exec_params: NavExecParams = params::load("nav_exec.toml")
        .wrap_err("Could not load exec params")?;

    let session = Session::new("nav_exec", &exec_params.sessions_dir)
        .wrap_err("Failed to create the session")?;

    let level = level_from_str(&exec_params.log_level)
        .wrap_err("Invalid log level")?;
    logger_init(level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let feat_ext_params: feat_ext::Params = params::load("feat_ext.toml")
        .wrap_err("Could not load FeatExt params")?;
    let pose_est_params: pose_est::Params = params::load("pose_est.toml")
        .wrap_err("Could not load PoseEst params")?;
    let fusion_params: fusion::Params = params::load("fusion.toml")
        .wrap_err("Could not load fusion params")?;
    let sim_params: sim::Params = params::load("sim.toml")
        .wrap_err("Could not load sim params")?;

    let mut mov_ctrl = MovCtrl::default();
    mov_ctrl.init("mov_ctrl.toml", &session)
        .wrap_err("Failed to initialise MovCtrl")?;
    info!("MovCtrl init complete");

    let mov_ctrl_period = period(exec_params.mov_ctrl_cycle_period_s)
        .wrap_err("Invalid MovCtrl cycle period")?;

    // ---- START THE DRIVER ----

    let feed = SensorFeed::new();
    let (driver, actuator) = SimDriver::start(sim_params, feed.clone())
        .wrap_err("Failed to start the simulated driver")?;

    let shutdown = Shutdown::new();
    shutdown.install_ctrlc_handler()
        .wrap_err("Failed to install the Ctrl-C handler")?;

    // ---- START THE TASKS ----

    let mut fusion_loop = FusionLoop::new(
        &fusion_params,
        FeatExt::new(feat_ext_params),
        pose_est_params,
        feed.clone(),
        SystemClock,
        shutdown.clone(),
    );
    fusion_loop.add_sink(Box::new(LogTmSink::new(fusion_params.log_tm_every)));
    fusion_loop.add_sink(Box::new(
        ArchiveTmSink::new(&session).wrap_err("Failed to create the pose archive")?,
    ));

    let mut mov_ctrl_task = MovCtrlTask::new(
        mov_ctrl,
        actuator,
        feed,
        SystemClock,
        shutdown.clone(),
        mov_ctrl_period,
    );

    // Each task raises shutdown when it ends, including by panicking, so
    // the other one follows it
    let fusion_guard = shutdown.guard();
    let fusion_jh = thread::Builder::new()
        .name("fusion".into())
        .spawn(move || {
            let _guard = fusion_guard;
            fusion_loop.run()
        })
        .wrap_err("Failed to spawn the fusion thread")?;

    let mov_ctrl_guard = shutdown.guard();
    let mov_ctrl_jh = thread::Builder::new()
        .name("mov_ctrl".into())
        .spawn(move || {
            let _guard = mov_ctrl_guard;
            mov_ctrl_task.run()
        })
        .wrap_err("Failed to spawn the MovCtrl thread")?;

    info!("Tasks started\n");

    // ---- WAIT FOR SHUTDOWN ----

    let mov_ctrl_res = mov_ctrl_jh.join();
    let fusion_res = fusion_jh.join();

    driver.stop().wrap_err("Failed to stop the simulated driver")?;

    let mov_ctrl_res = mov_ctrl_res.map_err(|_| eyre!("The MovCtrl thread panicked"))?;
    let fusion_res = fusion_res.map_err(|_| eyre!("The fusion thread panicked"))?;

    // A lost connection is a clean, if early, exit
    match mov_ctrl_res {
        Ok(()) => (),
        Err(MovCtrlError::ConnectionLost(d)) => info!("MovCtrl stopped, {} disconnected", d),
        Err(e) => {
            error!("MovCtrl exited with an error: {}", e);
            return Err(e).wrap_err("MovCtrl task failed");
        }
    }
    if let Err(FusionError::ConnectionLost(d)) = fusion_res {
        info!("Fusion stopped, {} disconnected", d);
    }

    info!("End of execution");

    Ok(())
}

/// Convert a cycle period from the parameter file.
fn period(period_s: f64) -> Result<Duration, Report> {
    if period_s.is_finite() && period_s > 0.0 {
        Ok(Duration::from_secs_f64(period_s))
    }
    else {
        Err(eyre!("Expected a positive period, found {} s", period_s))
    }
}
