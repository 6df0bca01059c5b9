//! Gateway ranking and health

use super::Context;

pub async fn gateways(ctx: &Context, check: bool) -> eyre::Result<()> {
    if check {
        let report = ctx.cache.check_gateways().await;
        return ctx.output.value(&report, || {
            report
                .iter()
                .map(|health| {
                    let time = health
                        .response_time_ms
                        .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));
                    format!("{:<8} {:>8}  {}", health.status, time, health.endpoint)
                })
                .collect::<Vec<_>>()
                .join("\n")
        });
    }

    let ranked = ctx.cache.registry().rank();
    ctx.output.value(&ranked, || {
        ranked
            .iter()
            .enumerate()
            .map(|(position, endpoint)| {
                let latency = endpoint
                    .last_latency_ms
                    .map_or_else(|| "unmeasured".to_string(), |ms| format!("{ms}ms"));
                format!("{:>2}. {}  ({latency})", position + 1, endpoint.base_url)
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
