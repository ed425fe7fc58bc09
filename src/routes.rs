#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    SignIn,
    SignUp,
    Dashboard,
    PlayerTracking,
    EventDetection,
    TacticalAnalysis,
    MatchReports,
    Settings,
}

/// Screens reachable from the sidebar, in sidebar order.
pub const NAV_SCREENS: [Screen; 6] = [
    Screen::Dashboard,
    Screen::PlayerTracking,
    Screen::EventDetection,
    Screen::TacticalAnalysis,
    Screen::MatchReports,
    Screen::Settings,
];

impl Screen {
    pub fn requires_auth(self) -> bool {
        !matches!(self, Screen::SignIn | Screen::SignUp)
    }

    pub fn is_analytics(self) -> bool {
        matches!(
            self,
            Screen::Dashboard
                | Screen::PlayerTracking
                | Screen::EventDetection
                | Screen::TacticalAnalysis
                | Screen::MatchReports
        )
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::SignIn => "Sign In",
            Screen::SignUp => "Sign Up",
            Screen::Dashboard => "Dashboard",
            Screen::PlayerTracking => "Player Tracking",
            Screen::EventDetection => "Event Detection",
            Screen::TacticalAnalysis => "Tactical Analysis",
            Screen::MatchReports => "Match Reports",
            Screen::Settings => "Settings",
        }
    }

    /// Sidebar shortcut, `1`..`6`.
    pub fn from_shortcut(key: char) -> Option<Screen> {
        let idx = key.to_digit(10)? as usize;
        if idx == 0 {
            return None;
        }
        NAV_SCREENS.get(idx - 1).copied()
    }
}

/// Where a navigation to `target` actually lands.
pub fn guard(target: Screen, authenticated: bool) -> Screen {
    if target.requires_auth() && !authenticated {
        return Screen::SignIn;
    }
    if !target.requires_auth() && authenticated {
        return Screen::Dashboard;
    }
    target
}
