use crate::config::Config;
use crate::controller::{ChatController, ExchangeResult, PendingExchange, Ticket};
use crate::events::TuiEvent;
use crate::service::RecipeService;
use crate::tui::{self, EventHandler, Tui};
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

type ExchangeSender = mpsc::UnboundedSender<(Ticket, ExchangeResult)>;

/// Run the interactive chat until the user quits.
pub async fn run(config: Config, service: Arc<dyn RecipeService>) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = event_loop(&mut terminal, &config, service).await;

    tui::restore()?;
    result
}

async fn event_loop(
    terminal: &mut Tui,
    config: &Config,
    service: Arc<dyn RecipeService>,
) -> Result<()> {
    let controller = ChatController::from_config(config);
    let mut manager = ConversationManager::new(controller, config.preferences);
    let mut events = EventHandler::new();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel();

    tracing::info!(endpoint = %config.endpoint, "chat session started");

    loop {
        terminal.draw(|frame| {
            let area = frame.size();
            manager.render_conversation_ui(area, frame.buffer_mut());
        })?;

        tokio::select! {
            event = events.next() => match event {
                Some(TuiEvent::Key(key)) => match manager.handle_key(key) {
                    ConversationAction::Send(pending) => {
                        spawn_exchange(service.clone(), pending, result_tx.clone());
                    }
                    ConversationAction::Exit => break,
                    ConversationAction::None => {}
                },
                Some(TuiEvent::Tick) => manager.on_tick(),
                Some(TuiEvent::Resize(width, height)) => {
                    tracing::debug!(width, height, "terminal resized");
                }
                None => break,
            },
            Some((ticket, result)) = result_rx.recv() => manager.settle(ticket, result),
        }
    }

    tracing::info!(
        messages = manager.controller().messages().len(),
        "chat session ended"
    );
    Ok(())
}

/// Send the exchange on its own task; the result comes back over `tx`.
/// If the UI is gone by then the send fails and the result is dropped.
fn spawn_exchange(service: Arc<dyn RecipeService>, pending: PendingExchange, tx: ExchangeSender) {
    tokio::spawn(async move {
        let result = service.send_chat(&pending.request).await;
        let _ = tx.send((pending.ticket, result));
    });
}
