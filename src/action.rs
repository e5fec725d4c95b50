//! User action definitions

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Navigation
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    JumpToCurrent,
    NextBranchTip,
    PrevBranchTip,

    // Branches shown
    ShowBranch,
    HideBranch,
    OpenHiddenBranches,
    SetAsParent,
    UnsetAsParent,

    // Git operations
    Checkout,
    CreateBranch,
    DeleteBranch,
    Commit,
    Merge,
    Push,
    Pull,
    Fetch,

    // UI
    ToggleHelp,
    Search,
    Refresh,
    Quit,

    // Dialogs
    Confirm,
    Cancel,
    InputChar(char),
    InputBackspace,
    PickUp,
    PickDown,
}
