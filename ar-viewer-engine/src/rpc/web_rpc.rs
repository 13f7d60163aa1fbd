use crate::engine::content::ContentRecord;
use crate::engine::loading::model_loader::LoadContentEvent;
use crate::engine::systems::status_notifications::ViewerStatus;
use crate::engine::tracking::HostTrackingBridge;
use crate::tools::mode_manager::{
    ArModeAction, ArModeEvent, InteractionEvent, ModeChangeSource, ResetTransformEvent,
    RetryEvent,
};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure. Requests without an id are notifications.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Queued traffic towards the host page.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the host page without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    /// Notifications queued since the last flush.
    pub fn pending_notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }
}

/// Schedule placement for the RPC systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum RpcSet {
    Intake,
    Flush,
}

/// Plugin establishing the postMessage RPC layer for iframe deployment.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .in_set(RpcSet::Intake),
            )
            .add_systems(Update, send_outgoing_messages.in_set(RpcSet::Flush));

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();
            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Some(window) = window() {
        if let Err(e) =
            window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            error!("Failed to register message listener: {:?}", e);
        }
    }

    // Listener lives for the page lifetime.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Messages collected by the page listener, drained once per frame.
#[derive(Resource, Default)]
pub struct MessageQueue(pub std::sync::Arc<std::sync::Mutex<Vec<String>>>);

impl MessageQueue {
    /// Queue a raw message, as the page listener does.
    pub fn push(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(message.into());
        }
    }
}

#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Everything an RPC method can trigger.
#[derive(SystemParam)]
pub struct RpcDispatch<'w> {
    status: Res<'w, ViewerStatus>,
    bridge: Res<'w, HostTrackingBridge>,
    content: EventWriter<'w, LoadContentEvent>,
    mode: EventWriter<'w, ArModeEvent>,
    reset: EventWriter<'w, ResetTransformEvent>,
    interaction: EventWriter<'w, InteractionEvent>,
    retry: EventWriter<'w, RetryEvent>,
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut dispatch: RpcDispatch,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                if let Some(response) = handle_rpc_request(&request, &mut dispatch) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Unparseable RPC message: {}", parse_error);
                rpc_interface.queue_response(create_error_response(
                    serde_json::Value::Null,
                    -32700,
                    "Parse error",
                    None,
                ));
            }
        }
    }
}

/// Dispatch one request. Only requests carrying an id get a response.
fn handle_rpc_request(request: &RpcRequest, dispatch: &mut RpcDispatch) -> Option<RpcResponse> {
    if request.jsonrpc != "2.0" {
        return request.id.clone().map(|id| {
            create_error_response(id, -32600, "Invalid Request", None)
        });
    }

    let result = if HostTrackingBridge::accepts(&request.method) {
        handle_host_tracking(&request.method, &request.params, &dispatch.bridge)
    } else {
        match request.method.as_str() {
            "load_content" => handle_load_content(&request.params, &mut dispatch.content),
            "enter_ar" => handle_mode_change(ArModeAction::Enter, &mut dispatch.mode),
            "exit_ar" => handle_mode_change(ArModeAction::Exit, &mut dispatch.mode),
            "reset_transform" => {
                dispatch.reset.write(ResetTransformEvent {
                    source: ModeChangeSource::Rpc,
                });
                Ok(serde_json::json!({ "success": true }))
            }
            "set_interaction" => handle_set_interaction(&request.params, &mut dispatch.interaction),
            "retry" => {
                dispatch.retry.write(RetryEvent);
                Ok(serde_json::json!({ "success": true }))
            }
            "get_status" => serde_json::to_value(&*dispatch.status)
                .map_err(|e| RpcError::internal_error(&e.to_string())),
            _ => {
                warn!("Unknown RPC method: {}", request.method);
                let id = request.id.clone()?;
                return Some(create_error_response(
                    id,
                    -32601,
                    "Method not found",
                    Some(serde_json::json!({"method": request.method})),
                ));
            }
        }
    };

    let id = request.id.clone()?;
    match result {
        Ok(result_value) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        }),
        Err(error) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        }),
    }
}

fn handle_host_tracking(
    method: &str,
    params: &serde_json::Value,
    bridge: &HostTrackingBridge,
) -> Result<serde_json::Value, RpcError> {
    bridge.handle_message(method, params).map_err(|e| {
        warn!("Malformed {} message: {}", method, e);
        RpcError::invalid_params(&format!("Malformed {method}: {e}"))
    })?;
    Ok(serde_json::json!({ "success": true }))
}

fn handle_load_content(
    params: &serde_json::Value,
    content_events: &mut EventWriter<LoadContentEvent>,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct LoadContentParams {
        record: ContentRecord,
    }

    let params = serde_json::from_value::<LoadContentParams>(params.clone())
        .map_err(|e| RpcError::invalid_params(&format!("Expected 'record': {e}")))?;

    let id = params.record.id.to_string();
    info!("Content {} pushed by host", id);
    content_events.write(LoadContentEvent {
        record: params.record,
    });

    Ok(serde_json::json!({ "success": true, "content_id": id }))
}

fn handle_mode_change(
    action: ArModeAction,
    mode_events: &mut EventWriter<ArModeEvent>,
) -> Result<serde_json::Value, RpcError> {
    info!("AR mode change requested over RPC: {:?}", action);
    mode_events.write(ArModeEvent {
        action,
        source: ModeChangeSource::Rpc,
    });
    Ok(serde_json::json!({ "success": true }))
}

fn handle_set_interaction(
    params: &serde_json::Value,
    interaction_events: &mut EventWriter<InteractionEvent>,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct InteractionParams {
        allow: bool,
    }

    let params = serde_json::from_value::<InteractionParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected boolean 'allow' parameter"))?;

    interaction_events.write(InteractionEvent {
        allow: params.allow,
    });
    Ok(serde_json::json!({ "success": true, "allow": params.allow }))
}

fn create_error_response(
    id: serde_json::Value,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id: Some(id),
    }
}

fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    // Responses after notifications so status reflects the request.
    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send serialized message to the parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }
}
