// src/db/memory.rs

//! Store em memória para os testes.
//!
//! Reproduz as restrições das migrations (um código ativo por sede, valor
//! ativo único entre sedes, pedido único por sede/número, uma concessão por
//! admin/sede) e expõe ganchos para simular corridas e falhas.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Mutex, MutexGuard,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{AccessStore, AdminStore, OrderStore, SedeStore, TokenStore},
    models::{
        access::{AdminSedeAccess, Capability},
        auth::Admin,
        order::{Document, NewDocument, PurchaseOrder, UploadedDocument},
        sede::{CreateSedePayload, Sede, UpdateSedePayload},
        token::{SedeToken, TokenCode},
    },
};

#[derive(Default)]
struct State {
    admins: Vec<Admin>,
    sedes: Vec<Sede>,
    tokens: Vec<SedeToken>,
    orders: Vec<PurchaseOrder>,
    documents: Vec<Document>,
    access: Vec<AdminSedeAccess>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    clock: AtomicI64,
    /// Consultas de código feitas por `find_active_match`.
    pub token_lookups: AtomicUsize,
    /// Faz `touch_last_used` falhar.
    pub fail_touch: AtomicBool,
    /// Faz o próximo `delete_document` falhar com erro transitório.
    pub fail_document_delete: AtomicBool,
    /// No próximo `insert_active`, outro chamador insere primeiro.
    pub race_token_insert: AtomicBool,
    /// No próximo `insert_order`, outro chamador insere primeiro.
    pub race_order_insert: AtomicBool,
    /// Faz o próximo `insert_document` falhar.
    pub fail_document_insert: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    // Relógio estritamente crescente, para a ordenação por data ser determinística
    fn now(&self) -> DateTime<Utc> {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        Utc::now() + Duration::milliseconds(tick)
    }

    pub fn seed_sede(&self, name: &str, email: &str) -> Sede {
        self.insert_sede(name, email, false)
    }

    pub fn seed_admin_sede(&self, name: &str) -> Sede {
        self.insert_sede(name, "admin@localhost", true)
    }

    fn insert_sede(&self, name: &str, email: &str, is_admin_sede: bool) -> Sede {
        let now = self.now();
        let sede = Sede {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            address: None,
            is_active: true,
            is_admin_sede,
            created_at: now,
            updated_at: now,
        };
        self.lock().sedes.push(sede.clone());
        sede
    }

    pub fn seed_admin(&self, email: &str) -> Admin {
        let now = self.now();
        let admin = Admin {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            full_name: email.to_string(),
            company: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().admins.push(admin.clone());
        admin
    }

    pub fn active_tokens(&self, sede_id: Uuid) -> Vec<SedeToken> {
        self.lock()
            .tokens
            .iter()
            .filter(|t| t.sede_id == sede_id && t.is_active)
            .cloned()
            .collect()
    }

    pub fn all_tokens(&self, sede_id: Uuid) -> Vec<SedeToken> {
        self.lock().tokens.iter().filter(|t| t.sede_id == sede_id).cloned().collect()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    fn push_token(state: &mut State, sede: &Sede, code: &str, email: &str, now: DateTime<Utc>) -> SedeToken {
        let token = SedeToken {
            id: Uuid::new_v4(),
            sede_id: sede.id,
            sede: sede.name.clone(),
            token: code.to_string(),
            email: email.to_string(),
            is_active: true,
            created_at: now,
            last_used_at: None,
        };
        state.tokens.push(token.clone());
        token
    }

    fn push_order(state: &mut State, sede: &Sede, order_number: &str, created_by: Uuid, now: DateTime<Utc>) -> PurchaseOrder {
        let order = PurchaseOrder {
            id: Uuid::new_v4(),
            order_number: order_number.to_string(),
            sede_id: sede.id,
            sede: sede.name.clone(),
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        };
        state.orders.push(order.clone());
        order
    }
}

#[async_trait]
impl SedeStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Sede>, AppError> {
        Ok(self.lock().sedes.iter().find(|s| s.name == name).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Sede>, AppError> {
        Ok(self.lock().sedes.iter().find(|s| s.id == id).cloned())
    }

    async fn list_active_public(&self) -> Result<Vec<Sede>, AppError> {
        let mut sedes: Vec<Sede> = self
            .lock()
            .sedes
            .iter()
            .filter(|s| s.is_active && !s.is_admin_sede)
            .cloned()
            .collect();
        sedes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sedes)
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Sede>, AppError> {
        let mut sedes: Vec<Sede> = self.lock().sedes.iter().filter(|s| ids.contains(&s.id)).cloned().collect();
        sedes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sedes)
    }

    async fn create(&self, input: &CreateSedePayload) -> Result<Sede, AppError> {
        if self.lock().sedes.iter().any(|s| s.name == input.name) {
            return Err(AppError::SedeAlreadyExists(input.name.clone()));
        }
        let mut sede = self.insert_sede(&input.name, &input.email, input.is_admin_sede);
        let mut state = self.lock();
        if let Some(stored) = state.sedes.iter_mut().find(|s| s.id == sede.id) {
            stored.phone = input.phone.clone();
            stored.address = input.address.clone();
            sede = stored.clone();
        }
        Ok(sede)
    }

    async fn update(&self, id: Uuid, patch: &UpdateSedePayload) -> Result<Option<Sede>, AppError> {
        let now = self.now();
        let mut state = self.lock();
        let Some(sede) = state.sedes.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(email) = &patch.email {
            sede.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            sede.phone = Some(phone.clone());
        }
        if let Some(address) = &patch.address {
            sede.address = Some(address.clone());
        }
        if let Some(active) = patch.is_active {
            sede.is_active = active;
        }
        sede.updated_at = now;
        Ok(Some(sede.clone()))
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find_active(&self, sede_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        Ok(self.active_tokens(sede_id).into_iter().next())
    }

    async fn find_active_match(&self, sede_name: &str, token: &str) -> Result<Option<SedeToken>, AppError> {
        self.token_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        let Some(sede) = state.sedes.iter().find(|s| s.name == sede_name && s.is_active && !s.is_admin_sede) else {
            return Ok(None);
        };
        Ok(state
            .tokens
            .iter()
            .find(|t| t.sede_id == sede.id && t.is_active && t.token == token)
            .cloned())
    }

    async fn find_by_id(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        Ok(self.lock().tokens.iter().find(|t| t.id == token_id).cloned())
    }

    async fn list_for_sede(&self, sede_id: Uuid) -> Result<Vec<SedeToken>, AppError> {
        let mut tokens = self.all_tokens(sede_id);
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn insert_active(&self, sede: &Sede, code: &TokenCode, email: &str) -> Result<SedeToken, AppError> {
        let now = self.now();
        let mut state = self.lock();

        if self.race_token_insert.swap(false, Ordering::SeqCst) {
            let rival = if code.as_str() == "999999" { "999998" } else { "999999" };
            Self::push_token(&mut state, sede, rival, email, now);
        }

        if state.tokens.iter().any(|t| t.sede_id == sede.id && t.is_active) {
            return Err(AppError::Conflict(format!("sede {} já tem código ativo", sede.id)));
        }
        if state.tokens.iter().any(|t| t.is_active && t.token == code.as_str()) {
            return Err(AppError::TokenCollision);
        }

        Ok(Self::push_token(&mut state, sede, code.as_str(), email, now))
    }

    async fn deactivate_all(&self, sede_id: Uuid) -> Result<u64, AppError> {
        let mut changed = 0;
        for token in self.lock().tokens.iter_mut().filter(|t| t.sede_id == sede_id && t.is_active) {
            token.is_active = false;
            changed += 1;
        }
        Ok(changed)
    }

    async fn deactivate(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        let mut state = self.lock();
        let Some(token) = state.tokens.iter_mut().find(|t| t.id == token_id) else {
            return Ok(None);
        };
        token.is_active = false;
        Ok(Some(token.clone()))
    }

    async fn activate(&self, token_id: Uuid) -> Result<Option<SedeToken>, AppError> {
        let mut state = self.lock();
        let Some(target) = state.tokens.iter().find(|t| t.id == token_id).cloned() else {
            return Ok(None);
        };
        if target.is_active {
            return Ok(Some(target));
        }
        if state
            .tokens
            .iter()
            .any(|t| t.is_active && t.token == target.token && t.sede_id != target.sede_id)
        {
            return Err(AppError::TokenCollision);
        }
        for token in state.tokens.iter_mut().filter(|t| t.sede_id == target.sede_id) {
            token.is_active = token.id == token_id;
        }
        Ok(state.tokens.iter().find(|t| t.id == token_id).cloned())
    }

    async fn touch_last_used(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(AppError::Transient("statement timeout".into()));
        }
        if let Some(token) = self.lock().tokens.iter_mut().find(|t| t.id == token_id) {
            token.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn is_active_for(&self, token_id: Uuid, sede_id: Uuid) -> Result<bool, AppError> {
        let state = self.lock();
        let sede_active = state.sedes.iter().any(|s| s.id == sede_id && s.is_active);
        Ok(sede_active
            && state
                .tokens
                .iter()
                .any(|t| t.id == token_id && t.sede_id == sede_id && t.is_active))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_order(&self, sede_id: Uuid, order_number: &str) -> Result<Option<PurchaseOrder>, AppError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.sede_id == sede_id && o.order_number == order_number)
            .cloned())
    }

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<PurchaseOrder>, AppError> {
        Ok(self.lock().orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn insert_order(
        &self,
        sede: &Sede,
        order_number: &str,
        created_by: Uuid,
    ) -> Result<PurchaseOrder, AppError> {
        let now = self.now();
        let mut state = self.lock();

        if self.race_order_insert.swap(false, Ordering::SeqCst) {
            Self::push_order(&mut state, sede, order_number, created_by, now);
        }

        if state.orders.iter().any(|o| o.sede_id == sede.id && o.order_number == order_number) {
            return Err(AppError::Conflict(format!("pedido {} já existe", order_number)));
        }

        Ok(Self::push_order(&mut state, sede, order_number, created_by, now))
    }

    async fn touch_order(&self, order_id: Uuid) -> Result<(), AppError> {
        let now = self.now();
        if let Some(order) = self.lock().orders.iter_mut().find(|o| o.id == order_id) {
            order.updated_at = now;
        }
        Ok(())
    }

    async fn list_orders(&self, sede_id: Uuid) -> Result<Vec<PurchaseOrder>, AppError> {
        let mut orders: Vec<PurchaseOrder> =
            self.lock().orders.iter().filter(|o| o.sede_id == sede_id).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_documents(&self, order_id: Uuid) -> Result<Vec<Document>, AppError> {
        let mut documents: Vec<Document> = self
            .lock()
            .documents
            .iter()
            .filter(|d| d.purchase_order_id == order_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn find_document(&self, document_id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.lock().documents.iter().find(|d| d.id == document_id).cloned())
    }

    async fn insert_document(&self, doc: &NewDocument) -> Result<Document, AppError> {
        if self.fail_document_insert.swap(false, Ordering::SeqCst) {
            return Err(AppError::Transient("connection reset".into()));
        }
        let document = Document {
            id: Uuid::new_v4(),
            purchase_order_id: doc.purchase_order_id,
            filename: doc.filename.clone(),
            original_filename: doc.original_filename.clone(),
            file_type: doc.file_type,
            file_size: doc.file_size,
            mime_type: doc.mime_type.clone(),
            file_path: doc.file_path.clone(),
            uploaded_by: Some(doc.uploaded_by),
            created_at: self.now(),
        };
        self.lock().documents.push(document.clone());
        Ok(document)
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<bool, AppError> {
        if self.fail_document_delete.swap(false, Ordering::SeqCst) {
            return Err(AppError::Transient("statement timeout".into()));
        }
        let mut state = self.lock();
        let before = state.documents.len();
        state.documents.retain(|d| d.id != document_id);
        Ok(state.documents.len() < before)
    }

    async fn list_uploaded_by(&self, admin_id: Uuid) -> Result<Vec<UploadedDocument>, AppError> {
        let state = self.lock();
        let mut documents: Vec<UploadedDocument> = state
            .documents
            .iter()
            .filter(|d| d.uploaded_by == Some(admin_id))
            .filter_map(|d| {
                let order = state.orders.iter().find(|o| o.id == d.purchase_order_id)?;
                Some(UploadedDocument {
                    document: d.clone(),
                    order_number: order.order_number.clone(),
                    sede_id: order.sede_id,
                    sede: order.sede.clone(),
                })
            })
            .collect();
        documents.sort_by(|a, b| b.document.created_at.cmp(&a.document.created_at));
        Ok(documents)
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn upsert(
        &self,
        admin_id: Uuid,
        sede_id: Uuid,
        can_view: bool,
        can_edit: bool,
    ) -> Result<AdminSedeAccess, AppError> {
        let now = self.now();
        let mut state = self.lock();
        if let Some(existing) = state
            .access
            .iter_mut()
            .find(|a| a.admin_id == admin_id && a.sede_id == sede_id)
        {
            existing.can_view = can_view;
            existing.can_edit = can_edit;
            return Ok(existing.clone());
        }
        let access = AdminSedeAccess {
            id: Uuid::new_v4(),
            admin_id,
            sede_id,
            can_view,
            can_edit,
            created_at: now,
        };
        state.access.push(access.clone());
        Ok(access)
    }

    async fn delete(&self, admin_id: Uuid, sede_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.lock();
        let before = state.access.len();
        state.access.retain(|a| !(a.admin_id == admin_id && a.sede_id == sede_id));
        Ok(state.access.len() < before)
    }

    async fn find(&self, admin_id: Uuid, sede_id: Uuid) -> Result<Option<AdminSedeAccess>, AppError> {
        Ok(self
            .lock()
            .access
            .iter()
            .find(|a| a.admin_id == admin_id && a.sede_id == sede_id)
            .cloned())
    }

    async fn list_for_admin(&self, admin_id: Uuid) -> Result<Vec<AdminSedeAccess>, AppError> {
        Ok(self.lock().access.iter().filter(|a| a.admin_id == admin_id).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<AdminSedeAccess>, AppError> {
        Ok(self.lock().access.clone())
    }

    async fn has_on_admin_sede(&self, admin_id: Uuid, capability: Capability) -> Result<bool, AppError> {
        let state = self.lock();
        Ok(state.access.iter().any(|a| {
            a.admin_id == admin_id
                && a.allows(capability)
                && state
                    .sedes
                    .iter()
                    .any(|s| s.id == a.sede_id && s.is_admin_sede && s.is_active)
        }))
    }

    async fn any_admin_sede_grant(&self) -> Result<bool, AppError> {
        let state = self.lock();
        Ok(state
            .access
            .iter()
            .any(|a| state.sedes.iter().any(|s| s.id == a.sede_id && s.is_admin_sede)))
    }

    async fn admin_sede_ids(&self) -> Result<Vec<Uuid>, AppError> {
        Ok(self.lock().sedes.iter().filter(|s| s.is_admin_sede).map(|s| s.id).collect())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, AppError> {
        Ok(self.lock().admins.iter().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>, AppError> {
        Ok(self.lock().admins.iter().find(|a| a.id == id).cloned())
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        company: Option<&str>,
    ) -> Result<Admin, AppError> {
        let now = self.now();
        let mut state = self.lock();
        if state.admins.iter().any(|a| a.email == email) {
            return Err(AppError::EmailAlreadyExists);
        }
        let admin = Admin {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.to_string(),
            company: company.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        state.admins.push(admin.clone());
        Ok(admin)
    }
}
