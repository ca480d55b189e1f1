//! Platform vocabulary: block categories, condition categories and targets

use std::fmt;

/// Block id of function definition headers
pub const FUNCTION_BLOCK: &str = "func";
/// Block id of process definition headers
pub const PROCESS_BLOCK: &str = "process";
/// Block id of repeat headers
pub const REPEAT_BLOCK: &str = "repeat";
/// Block id of the else block placed between two bracket pairs
pub const ELSE_BLOCK: &str = "else";
/// Action name under which definition headers look up their schema and tags
pub const DEFINITION_ACTION: &str = "dynamic";

/// Category of a single (non-bracketed) codeblock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCategory {
    Event,
    EntityEvent,
    PlayerAction,
    EntityAction,
    GameAction,
    Control,
    SetVariable,
    SelectObject,
    CallFunction,
    StartProcess,
}

impl BlockCategory {
    /// Platform block id
    pub fn block_id(self) -> &'static str {
        match self {
            BlockCategory::Event => "event",
            BlockCategory::EntityEvent => "entity_event",
            BlockCategory::PlayerAction => "player_action",
            BlockCategory::EntityAction => "entity_action",
            BlockCategory::GameAction => "game_action",
            BlockCategory::Control => "control",
            BlockCategory::SetVariable => "set_var",
            BlockCategory::SelectObject => "select_obj",
            BlockCategory::CallFunction => "call_func",
            BlockCategory::StartProcess => "start_process",
        }
    }

    /// Events start a code line
    pub fn is_event(self) -> bool {
        matches!(self, BlockCategory::Event | BlockCategory::EntityEvent)
    }

    /// Call blocks carry a callee name instead of an action
    pub fn is_call(self) -> bool {
        matches!(self, BlockCategory::CallFunction | BlockCategory::StartProcess)
    }

    /// Which kind of target this category accepts, if any
    pub fn target_side(self) -> Option<TargetSide> {
        match self {
            BlockCategory::PlayerAction => Some(TargetSide::Player),
            BlockCategory::EntityAction => Some(TargetSide::Entity),
            _ => None,
        }
    }
}

impl fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_id())
    }
}

/// Category of a conditional header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionCategory {
    IfPlayer,
    IfEntity,
    IfGame,
    IfVariable,
}

impl ConditionCategory {
    pub fn block_id(self) -> &'static str {
        match self {
            ConditionCategory::IfPlayer => "if_player",
            ConditionCategory::IfEntity => "if_entity",
            ConditionCategory::IfGame => "if_game",
            ConditionCategory::IfVariable => "if_var",
        }
    }

    pub fn target_side(self) -> Option<TargetSide> {
        match self {
            ConditionCategory::IfPlayer => Some(TargetSide::Player),
            ConditionCategory::IfEntity => Some(TargetSide::Entity),
            _ => None,
        }
    }
}

/// The two families of target selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSide {
    Player,
    Entity,
}

impl fmt::Display for TargetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSide::Player => f.write_str("player"),
            TargetSide::Entity => f.write_str("entity"),
        }
    }
}

/// Target selector of an action or condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Default,
    Selection,
    AllPlayers,
    Damager,
    Shooter,
    Killer,
    Victim,
    AllEntities,
    AllMobs,
    LastEntity,
    LastMob,
    Projectile,
}

impl Target {
    const ALL: [Target; 12] = [
        Target::Default,
        Target::Selection,
        Target::AllPlayers,
        Target::Damager,
        Target::Shooter,
        Target::Killer,
        Target::Victim,
        Target::AllEntities,
        Target::AllMobs,
        Target::LastEntity,
        Target::LastMob,
        Target::Projectile,
    ];

    /// Platform spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Default => "Default",
            Target::Selection => "Selection",
            Target::AllPlayers => "AllPlayers",
            Target::Damager => "Damager",
            Target::Shooter => "Shooter",
            Target::Killer => "Killer",
            Target::Victim => "Victim",
            Target::AllEntities => "AllEntities",
            Target::AllMobs => "AllMobs",
            Target::LastEntity => "LastEntity",
            Target::LastMob => "LastMob",
            Target::Projectile => "Projectile",
        }
    }

    /// Parse the platform spelling
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Whether the selector exists for the given side
    pub fn allowed_on(self, side: TargetSide) -> bool {
        match self {
            Target::Default | Target::Selection | Target::Killer | Target::Victim => true,
            Target::AllPlayers | Target::Damager | Target::Shooter => side == TargetSide::Player,
            Target::AllEntities
            | Target::AllMobs
            | Target::LastEntity
            | Target::LastMob
            | Target::Projectile => side == TargetSide::Entity,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names_round_trip() {
        for target in Target::ALL {
            assert_eq!(Target::from_name(target.as_str()), Some(target));
        }
        assert_eq!(Target::from_name("Nobody"), None);
    }

    #[test]
    fn test_target_sides() {
        assert!(Target::Default.allowed_on(TargetSide::Entity));
        assert!(Target::AllPlayers.allowed_on(TargetSide::Player));
        assert!(!Target::AllPlayers.allowed_on(TargetSide::Entity));
        assert!(!Target::LastEntity.allowed_on(TargetSide::Player));
    }

    #[test]
    fn test_block_ids() {
        assert_eq!(BlockCategory::PlayerAction.block_id(), "player_action");
        assert_eq!(BlockCategory::SetVariable.block_id(), "set_var");
        assert_eq!(ConditionCategory::IfVariable.block_id(), "if_var");
        assert!(BlockCategory::EntityEvent.is_event());
        assert!(BlockCategory::StartProcess.is_call());
    }
}
