use anyhow::{Context, Result};
use tracing::{error, info};
use unsplittable_flow_router::{config, domain, optimizer, telemetry};
use config::Config;
use domain::{Network, Topology};
use optimizer::UnsplittableFlowRouter;
use telemetry::init_tracing;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(&cfg.logging);

    let mut network = Network::load(&cfg.network.path)
        .with_context(|| format!("failed to load network {}", cfg.network.path.display()))?;

    let router = UnsplittableFlowRouter::from_config(&cfg);
    info!(
        algorithm = router.description(),
        solver = %cfg.solver.backend,
        network = %cfg.network.path.display(),
        "starting unsplittable flow routing"
    );

    let result = match router.solve_and_route(&mut network) {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "routing failed, no routing committed");
            return Err(e.into());
        }
    };

    println!("{}", result.summary());
    for route in result.routing.routes() {
        let demand = &network.demands()[route.demand];
        println!(
            "demand {} ({} -> {}, traffic {}): {}",
            route.demand,
            network.nodes()[demand.ingress].name,
            network.nodes()[demand.egress].name,
            demand.offered_traffic,
            network.describe_route(route),
        );
    }
    Ok(())
}
