use dioxus::prelude::*;

use crate::client::RealtimeClient;
use crate::ws::use_store_signal;

#[derive(Props, Clone, PartialEq)]
pub struct RealtimeProviderProps {
    pub client: RealtimeClient,
    pub children: Element,
}

/// Puts `client`, and one signal mirroring its store, in context for the
/// realtime hooks below it.
#[component]
pub fn RealtimeProvider(props: RealtimeProviderProps) -> Element {
    let client = use_context_provider(|| props.client.clone());
    let state = use_store_signal(&client);
    use_context_provider(move || state);

    rsx! {
        {props.children}
    }
}
