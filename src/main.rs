use std::process::exit;

use geoglance::controller::{Controller, LifecycleEvent};
use geoglance::display::{self, DisplayModel};
use geoglance::platform::sim::{SimPlatform, SimScenario};
use geoglance::util::{config::get_config, setup_tracing};
use tokio::sync::oneshot::{self, error::RecvError, Receiver};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    info!("Geoglance {}", env!("CARGO_PKG_VERSION"));

    let scenario: SimScenario = get_config().get("sim")?;
    let platform = SimPlatform::new(scenario);

    let (lifecycle_tx, lifecycle_rx) = mpsc::channel(4);
    let (display_tx, display_rx) = watch::channel(DisplayModel::default());

    let controller_channel = start_controller(platform, display_tx, lifecycle_rx);
    let screen_channel = start_screen(display_rx);

    lifecycle_tx.send(LifecycleEvent::Resume).await?;
    start_shutdown_listener(lifecycle_tx);

    tokio::select! {
        res = controller_channel => handle_nested_result(res),
        res = screen_channel => handle_nested_result(res),
    }

    Ok(())
}

fn handle_nested_result(res: Result<anyhow::Result<()>, RecvError>) {
    match res {
        Err(err) => {
            error!("An internal error occurred: {:?}", err);
            exit(2)
        }
        Ok(nested) => handle_result(nested),
    }
}

fn handle_result(res: anyhow::Result<()>) {
    if let Err(err) = res {
        error!("An error occurred: {:?}", err);
        exit(1)
    }
}

fn start_controller(
    platform: SimPlatform,
    display: watch::Sender<DisplayModel>,
    lifecycle: mpsc::Receiver<LifecycleEvent>,
) -> Receiver<anyhow::Result<()>> {
    let (sender, receiver) = oneshot::channel::<anyhow::Result<()>>();
    tokio::spawn(async move {
        sender
            .send(Controller::new(platform, display).run(lifecycle).await)
            .unwrap();
    });
    receiver
}

fn start_screen(display: watch::Receiver<DisplayModel>) -> Receiver<anyhow::Result<()>> {
    let (sender, receiver) = oneshot::channel::<anyhow::Result<()>>();
    tokio::spawn(async move {
        sender.send(display::run_screen(display).await).unwrap();
    });
    receiver
}

/// Ctrl-C maps to the pause/destroy lifecycle pair so the subscription is
/// released before the process exits.
fn start_shutdown_listener(lifecycle: mpsc::Sender<LifecycleEvent>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            let _ = lifecycle.send(LifecycleEvent::Pause).await;
            let _ = lifecycle.send(LifecycleEvent::Destroy).await;
        }
    });
}
