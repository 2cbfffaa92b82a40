//! Polling router: receives source-chat updates and feeds them to a bounded
//! worker pool running the forwarding engine.

use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tgf_core::{
    config::Config,
    domain::ChatId,
    engine::{ForwardOutcome, ForwardingEngine},
    store::ForwardMap,
    tracked::TrackedUserSet,
    transport::types::InboundMessage,
};

use crate::{to_inbound, TelegramTransport};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub transport: Arc<TelegramTransport>,
    pub queue: mpsc::Sender<InboundMessage>,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let source_chat = ChatId(cfg.source_chat_id);
    let destination_chat = ChatId(cfg.destination_chat_id);
    let transport = Arc::new(TelegramTransport::new(
        bot.clone(),
        source_chat,
        cfg.message_cache_size,
    ));
    let tracked = Arc::new(TrackedUserSet::new(cfg.tracked_users.iter().copied()));
    let engine = Arc::new(ForwardingEngine::new(
        transport.clone(),
        Arc::new(ForwardMap::new()),
        tracked,
        source_chat,
        destination_chat,
    ));

    if let Ok(me) = bot.get_me().await {
        tracing::info!(username = %me.username(), "forwarder started");
    }
    tracing::info!(
        source = cfg.source_chat_id,
        destination = cfg.destination_chat_id,
        tracked_users = engine.tracked().len(),
        "listening for messages"
    );

    let (tx, rx) = mpsc::channel::<InboundMessage>(cfg.queue_depth);
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    let cancel = CancellationToken::new();
    let mut workers = Vec::with_capacity(cfg.workers);
    for n in 0..cfg.workers {
        workers.push(tokio::spawn(worker(
            n,
            rx.clone(),
            engine.clone(),
            cancel.clone(),
        )));
    }

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        transport,
        queue: tx,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(on_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    // Dispatcher has shut down. Stop the workers; one mid-pipeline completes
    // its current message before noticing the cancellation.
    cancel.cancel();
    for w in workers {
        let _ = w.await;
    }

    Ok(())
}

async fn on_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.chat.id.0 != state.cfg.source_chat_id {
        return Ok(());
    }

    let inbound = to_inbound(&msg);

    // Every source-chat message becomes fetchable as a reply parent, whether
    // or not it gets forwarded itself.
    state.transport.remember(inbound.clone());

    // Bounded queue: awaiting here applies backpressure to the dispatcher
    // instead of spawning an unbounded task per update.
    if state.queue.send(inbound).await.is_err() {
        tracing::error!("inbound queue closed, dropping message");
    }

    Ok(())
}

async fn worker(
    n: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>>,
    engine: Arc<ForwardingEngine>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            m = async { rx.lock().await.recv().await } => match m {
                Some(m) => m,
                None => break,
            },
        };

        match engine.handle_message(&msg).await {
            Ok(ForwardOutcome::Forwarded(dest)) => {
                tracing::debug!(worker = n, ?dest, "forwarded");
            }
            Ok(ForwardOutcome::FilteredOut) | Ok(ForwardOutcome::AlreadyForwarded) => {}
            Err(e) => {
                tracing::error!(
                    worker = n,
                    message_id = msg.message_id.0,
                    error = %e,
                    "forwarding failed"
                );
            }
        }
    }
}
