//! Shared application state.

use std::sync::Arc;

use crate::usecase::{
    AuthenticateUseCase, ConnectionLifecycle, GetServerInfoUseCase, ListRoomsUseCase,
    ListServersUseCase, LoginUseCase,
};

/// Shared application state
pub struct AppState {
    pub login_usecase: Arc<LoginUseCase>,
    pub authenticate_usecase: Arc<AuthenticateUseCase>,
    pub connection_lifecycle: Arc<ConnectionLifecycle>,
    pub list_servers_usecase: Arc<ListServersUseCase>,
    pub get_server_info_usecase: Arc<GetServerInfoUseCase>,
    pub list_rooms_usecase: Arc<ListRoomsUseCase>,
}
