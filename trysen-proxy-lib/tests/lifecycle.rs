use std::time::Duration;

use trysen_proxy_lib::Shutdown;

#[tokio::test]
async fn test_trigger_is_idempotent() {
    let shutdown = Shutdown::new();
    assert!(!shutdown.is_triggered());

    assert!(shutdown.trigger("first"));
    assert!(!shutdown.trigger("second"));
    assert!(!shutdown.clone().trigger("third"));
    assert!(shutdown.is_triggered());
}

#[tokio::test]
async fn test_draining_resolves_for_all_clones() -> Result<(), Box<dyn std::error::Error + Send + Sync>>
{
    let shutdown = Shutdown::new();
    let waiter = shutdown.clone();
    let task = tokio::spawn(async move { waiter.draining().await });

    tokio::task::yield_now().await;
    assert!(!task.is_finished());

    shutdown.trigger("test");
    tokio::time::timeout(Duration::from_secs(1), task).await??;
    assert!(shutdown.drain_token().is_cancelled());
    Ok(())
}

#[tokio::test]
async fn test_force_close_is_separate_from_drain(
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let shutdown = Shutdown::new();
    shutdown.trigger("test");

    let forced = tokio::time::timeout(Duration::from_millis(50), shutdown.forced()).await;
    assert!(forced.is_err(), "draining must not force connections closed");

    shutdown.force_close();
    tokio::time::timeout(Duration::from_secs(1), shutdown.forced()).await?;
    Ok(())
}
