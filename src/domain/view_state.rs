//! Browser View State
//!
//! Presentation bookkeeping for the key browser, tree view and workbench:
//! panel sizes, scroll positions and selection. Passed explicitly to the
//! rendering side instead of living in a global store.

use crate::constants::{DEFAULT_DELIMITER, VIEW_STATE_FILE};
use crate::domain::RedisDataType;
use crate::error::Result;
use crate::helpers::{get_or_create_config_dir, load_json, save_json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Relative panel widths keyed by panel id
pub type PanelSizes = BTreeMap<String, f64>;

/// How the key list was populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    Pattern,
    Redisearch,
}

/// Key list panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyListState {
    pub is_data_pattern_loaded: bool,
    pub is_data_redisearch_loaded: bool,
    pub scroll_pattern_top_position: f64,
    pub scroll_redisearch_top_position: f64,
    pub is_not_rendered: bool,
    pub selected_key: Option<Bytes>,
}

impl Default for KeyListState {
    fn default() -> Self {
        Self {
            is_data_pattern_loaded: false,
            is_data_redisearch_loaded: false,
            scroll_pattern_top_position: 0.0,
            scroll_redisearch_top_position: 0.0,
            is_not_rendered: true,
            selected_key: None,
        }
    }
}

/// A key shown as a selected leaf in the tree view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeLeafKey {
    pub name: String,
    #[serde(rename = "type")]
    pub key_type: Option<RedisDataType>,
}

/// Namespace tree panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeState {
    pub delimiter: String,
    pub panel_sizes: PanelSizes,
    pub open_nodes: BTreeMap<String, bool>,
    /// Leaf field (`<pattern>keys`) to the keys shown under it
    pub selected_leaf: BTreeMap<String, BTreeMap<String, TreeLeafKey>>,
}

impl Default for TreeState {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            panel_sizes: PanelSizes::new(),
            open_nodes: BTreeMap::new(),
            selected_leaf: BTreeMap::new(),
        }
    }
}

/// Suffix appended to a namespace pattern to form its leaf field
pub fn tree_leaf_field(delimiter: &str) -> String {
    format!("{delimiter}keys:keys")
}

/// Browser page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserState {
    pub key_list: KeyListState,
    pub panel_sizes: PanelSizes,
    pub tree: TreeState,
    pub bulk_actions_opened: bool,
    pub key_details_sizes: BTreeMap<RedisDataType, PanelSizes>,
}

/// Workbench enablement area (tutorial pane)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnablementAreaState {
    pub item_path: String,
    pub item_scroll_top: f64,
}

/// Workbench page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchState {
    pub script: String,
    pub enablement_area: EnablementAreaState,
    pub vertical_panel_sizes: PanelSizes,
}

/// Pub/Sub page form fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubSubState {
    pub channel: String,
    pub message: String,
}

/// All per-window view state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppContextState {
    pub context_instance_id: String,
    pub last_page: String,
    pub browser: BrowserState,
    pub workbench: WorkbenchState,
    pub pubsub: PubSubState,
    pub last_viewed_analytics_page: String,
}

impl AppContextState {
    /// Reset everything except the connected instance and key details sizes
    pub fn reset(&mut self) {
        let instance_id = std::mem::take(&mut self.context_instance_id);
        let key_details_sizes = std::mem::take(&mut self.browser.key_details_sizes);

        *self = Self::default();
        self.context_instance_id = instance_id;
        self.browser.key_details_sizes = key_details_sizes;
    }

    pub fn set_connected_instance(&mut self, instance_id: impl Into<String>) {
        self.context_instance_id = instance_id.into();
    }

    pub fn select_key(&mut self, key: Option<Bytes>) {
        self.browser.key_list.selected_key = key;
    }

    pub fn set_key_list_loaded(&mut self, mode: SearchMode, loaded: bool) {
        match mode {
            SearchMode::Pattern => self.browser.key_list.is_data_pattern_loaded = loaded,
            SearchMode::Redisearch => self.browser.key_list.is_data_redisearch_loaded = loaded,
        }
    }

    pub fn set_scroll_position(&mut self, mode: SearchMode, top: f64) {
        match mode {
            SearchMode::Pattern => self.browser.key_list.scroll_pattern_top_position = top,
            SearchMode::Redisearch => self.browser.key_list.scroll_redisearch_top_position = top,
        }
    }

    pub fn scroll_position(&self, mode: SearchMode) -> f64 {
        match mode {
            SearchMode::Pattern => self.browser.key_list.scroll_pattern_top_position,
            SearchMode::Redisearch => self.browser.key_list.scroll_redisearch_top_position,
        }
    }

    /// Open a tutorial item; scroll restarts only when the item changes
    pub fn set_enablement_item(&mut self, item_path: impl Into<String>) {
        let item_path = item_path.into();
        let area = &mut self.workbench.enablement_area;
        if area.item_path != item_path {
            area.item_scroll_top = 0.0;
        }
        area.item_path = item_path;
    }

    pub fn reset_enablement_item(&mut self) {
        self.workbench.enablement_area = EnablementAreaState::default();
    }

    /// Follow a key rename inside the selected tree leaf.
    ///
    /// The renamed key stays in the leaf only if it still matches the leaf
    /// pattern at the same namespace depth; otherwise it is dropped.
    pub fn rename_selected_leaf_key(&mut self, key: &str, new_key: &str) {
        let tree = &mut self.browser.tree;
        let leaf_suffix = tree_leaf_field(&tree.delimiter);
        let delimiter = tree.delimiter.clone();

        let Some((leaf_field, keys)) = tree.selected_leaf.iter_mut().next() else {
            return;
        };
        let Some(mut entry) = keys.remove(key) else {
            return;
        };

        let pattern = leaf_field.split(leaf_suffix.as_str()).next().unwrap_or_default();
        let fits = new_key.starts_with(pattern)
            && pattern.split(delimiter.as_str()).count() == new_key.split(delimiter.as_str()).count();

        if fits {
            entry.name = new_key.to_string();
            keys.insert(new_key.to_string(), entry);
        }
    }

    pub fn reset_tree(&mut self) {
        self.browser.tree.selected_leaf.clear();
        self.browser.tree.open_nodes.clear();
    }

    pub fn set_tree_delimiter(&mut self, delimiter: impl Into<String>) {
        self.browser.tree.delimiter = delimiter.into();
    }

    pub fn update_key_details_sizes(&mut self, key_type: RedisDataType, sizes: PanelSizes) {
        self.browser.key_details_sizes.insert(key_type, sizes);
    }

    /// Subset worth keeping across restarts
    pub fn persisted(&self) -> PersistedViewState {
        let mut tree_delimiters = BTreeMap::new();
        if !self.context_instance_id.is_empty() {
            tree_delimiters.insert(
                self.context_instance_id.clone(),
                self.browser.tree.delimiter.clone(),
            );
        }
        PersistedViewState {
            tree_delimiters,
            key_details_sizes: self.browser.key_details_sizes.clone(),
        }
    }

    /// Restore persisted values for the connected instance
    pub fn apply_persisted(&mut self, persisted: &PersistedViewState) {
        if let Some(delimiter) = persisted.tree_delimiters.get(&self.context_instance_id) {
            self.browser.tree.delimiter = delimiter.clone();
        }
        self.browser.key_details_sizes = persisted.key_details_sizes.clone();
    }
}

/// View state saved to `view-state.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedViewState {
    /// Tree delimiter per instance id
    pub tree_delimiters: BTreeMap<String, String>,
    pub key_details_sizes: BTreeMap<RedisDataType, PanelSizes>,
}

impl PersistedViewState {
    /// Merge another snapshot, newer values winning
    pub fn merge(&mut self, other: PersistedViewState) {
        self.tree_delimiters.extend(other.tree_delimiters);
        self.key_details_sizes.extend(other.key_details_sizes);
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }

    /// Load from the config directory
    pub fn load() -> Result<Self> {
        Self::load_from(&get_or_create_config_dir()?.join(VIEW_STATE_FILE))
    }

    /// Save to the config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_or_create_config_dir()?.join(VIEW_STATE_FILE))
    }
}
