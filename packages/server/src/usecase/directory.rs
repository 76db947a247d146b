//! UseCase: サーバー・ルームの参照

use std::sync::Arc;

use crate::domain::{ChatRoom, ChatServer, DirectoryRepository, ServerId};

use super::error::DirectoryError;

/// サーバー一覧の取得
pub struct ListServersUseCase {
    repository: Arc<dyn DirectoryRepository>,
}

impl ListServersUseCase {
    pub fn new(repository: Arc<dyn DirectoryRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self) -> Result<Vec<ChatServer>, DirectoryError> {
        Ok(self.repository.list_servers().await?)
    }
}

/// サーバー情報の取得
pub struct GetServerInfoUseCase {
    repository: Arc<dyn DirectoryRepository>,
}

impl GetServerInfoUseCase {
    pub fn new(repository: Arc<dyn DirectoryRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, id: ServerId) -> Result<ChatServer, DirectoryError> {
        self.repository
            .find_server(id)
            .await?
            .ok_or(DirectoryError::ServerNotFound(id))
    }
}

/// サーバー内のルーム一覧の取得
pub struct ListRoomsUseCase {
    repository: Arc<dyn DirectoryRepository>,
}

impl ListRoomsUseCase {
    pub fn new(repository: Arc<dyn DirectoryRepository>) -> Self {
        Self { repository }
    }

    /// 存在しないサーバーは ServerNotFound
    pub async fn execute(&self, server_id: ServerId) -> Result<Vec<ChatRoom>, DirectoryError> {
        if self.repository.find_server(server_id).await?.is_none() {
            return Err(DirectoryError::ServerNotFound(server_id));
        }
        Ok(self.repository.list_rooms(server_id).await?)
    }
}
